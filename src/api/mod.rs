pub mod http;
pub mod memory;

use std::collections::BTreeMap;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use crate::model::schema::{Countries, Logics, Timezones};
use crate::model::{
    Connection, ConnectionId, ConnectionPatch, NewConnection, NewNode, Node, NodeId, NodePatch,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Field-level validation messages keyed by dotted field path
/// (`name`, `settings.on_hours`, `non_field_errors`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn with(mut self, field: &str, message: impl Into<String>) -> Self {
        self.add(field, message);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Flatten a REST framework error body. Nested objects become dotted paths,
    /// bare strings become single messages.
    pub fn from_json(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        let mut errors = FieldErrors::new();
        for (key, value) in object {
            collect(&mut errors, key, value);
        }
        Some(errors)
    }
}

fn collect(errors: &mut FieldErrors, path: &str, value: &Value) {
    match value {
        Value::String(s) => errors.add(path, s.clone()),
        Value::Array(items) => {
            for item in items {
                collect(errors, path, item);
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                collect(errors, &format!("{}.{}", path, key), nested);
            }
        }
        Value::Null => {}
        other => errors.add(path, other.to_string()),
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The backend REST surface the editor consumes.
#[async_trait]
pub trait GraphApi: Send + Sync {
    async fn list_nodes(&self) -> ApiResult<Vec<Node>>;
    async fn create_node(&self, node: &NewNode) -> ApiResult<Node>;
    async fn update_node(&self, id: NodeId, patch: &NodePatch) -> ApiResult<Node>;
    async fn delete_node(&self, id: NodeId) -> ApiResult<()>;

    async fn list_connections(&self) -> ApiResult<Vec<Connection>>;
    async fn create_connection(&self, connection: &NewConnection) -> ApiResult<Connection>;
    async fn update_connection(&self, id: ConnectionId, patch: &ConnectionPatch) -> ApiResult<Connection>;
    async fn delete_connection(&self, id: ConnectionId) -> ApiResult<()>;

    async fn list_logics(&self) -> ApiResult<Logics>;
    async fn list_countries(&self) -> ApiResult<Countries>;
    async fn list_timezones(&self) -> ApiResult<Timezones>;

    /// `Ok(None)` when the variable is unset.
    async fn get_variable(&self, name: &str) -> ApiResult<Option<Value>>;
    async fn create_variable(&self, name: &str, value: &Value) -> ApiResult<()>;
    async fn update_variable(&self, name: &str, value: &Value) -> ApiResult<()>;
}
