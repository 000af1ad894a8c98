use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::api::{ApiResult, GraphApi};
use crate::model::schema::StaticData;
use crate::model::settings::{Settings, COUNTRY_CODE_VARIABLE, TIMEZONE_VARIABLE};
use crate::model::{Connection, Node};

/// Sequenced fetches and the write policies layered over a [`GraphApi`].
#[derive(Clone)]
pub struct SyncClient {
    api: Arc<dyn GraphApi>,
}

impl SyncClient {
    pub fn new(api: Arc<dyn GraphApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &dyn GraphApi {
        self.api.as_ref()
    }

    /// Logic schemas, countries and timezones, in that order.
    pub async fn fetch_static(&self) -> ApiResult<StaticData> {
        let logics = self.api.list_logics().await?;
        let countries = self.api.list_countries().await?;
        let timezones = self.api.list_timezones().await?;
        info!(
            logics = logics.len(),
            countries = countries.len(),
            timezones = timezones.len(),
            "Loaded reference data"
        );
        Ok(StaticData { logics, countries, timezones })
    }

    /// Nodes then connections.
    pub async fn fetch_graph(&self) -> ApiResult<(Vec<Node>, Vec<Connection>)> {
        let nodes = self.api.list_nodes().await?;
        let connections = self.api.list_connections().await?;
        debug!(nodes = nodes.len(), connections = connections.len(), "Fetched graph");
        Ok((nodes, connections))
    }

    /// Unset variables read as `None`; any other failure aborts the whole read.
    pub async fn fetch_settings(&self) -> ApiResult<Settings> {
        let country_code = self.read_string(COUNTRY_CODE_VARIABLE).await?;
        let timezone = self.read_string(TIMEZONE_VARIABLE).await?;
        Ok(Settings { country_code, timezone })
    }

    async fn read_string(&self, name: &str) -> ApiResult<Option<String>> {
        Ok(match self.api.get_variable(name).await? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }

    pub async fn save_settings(&self, settings: &Settings) -> ApiResult<()> {
        for (name, value) in settings.variables() {
            self.upsert_variable(name, &Value::String(value.to_string())).await?;
        }
        Ok(())
    }

    /// Create the variable; if that fails, update it in place.
    pub async fn upsert_variable(&self, name: &str, value: &Value) -> ApiResult<()> {
        match self.api.create_variable(name, value).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(variable = name, error = %e, "Create failed, updating instead");
                self.api.update_variable(name, value).await.inspect_err(|e| {
                    warn!(variable = name, error = %e, "Variable update failed");
                })
            }
        }
    }
}
