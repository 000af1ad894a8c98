use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use crate::api::{ApiError, ApiResult, FieldErrors, GraphApi};
use crate::model::schema::{Countries, Logics, Timezones};
use crate::model::{
    Connection, ConnectionId, ConnectionPatch, NewConnection, NewNode, Node, NodeId, NodePatch,
};

pub const CSRF_HEADER: &str = "X-CSRFToken";
const API_PREFIX: &str = "/api/v1";

/// REST client for the graph backend.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
    session_cookie: Option<String>,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token: None,
            session_cookie: None,
        })
    }

    /// Token sent on every mutating request, as handed out by the hosting page.
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mutating = method != Method::GET;
        let mut builder = self.client.request(method, self.url(path));
        if let Some(cookie) = &self.session_cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }
        if mutating {
            if let Some(token) = &self.csrf_token {
                builder = builder.header(CSRF_HEADER, token);
            }
        }
        builder
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        debug!(path, "GET");
        let response = check(self.request(Method::GET, path).send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%method, path, "Sending");
        let response = check(self.request(method, path).json(body).send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<()> {
        debug!(%method, path, "Sending");
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        check(builder.send().await?).await?;
        Ok(())
    }
}

/// Map non-success statuses onto the error taxonomy.
async fn check(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

pub fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::NOT_FOUND {
        return ApiError::NotFound;
    }
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
        if let Some(errors) = serde_json::from_str::<Value>(body)
            .ok()
            .as_ref()
            .and_then(FieldErrors::from_json)
        {
            return ApiError::Validation(errors);
        }
    }
    ApiError::Status {
        status: status.as_u16(),
        body: body.to_string(),
    }
}

#[derive(serde::Deserialize)]
struct VariableBody {
    value: Value,
}

#[async_trait]
impl GraphApi for HttpApi {
    async fn list_nodes(&self) -> ApiResult<Vec<Node>> {
        self.get_json("/nodes/").await
    }

    async fn create_node(&self, node: &NewNode) -> ApiResult<Node> {
        self.send_json(Method::POST, "/nodes/", node).await
    }

    async fn update_node(&self, id: NodeId, patch: &NodePatch) -> ApiResult<Node> {
        self.send_json(Method::PATCH, &format!("/nodes/{}/", id), patch).await
    }

    async fn delete_node(&self, id: NodeId) -> ApiResult<()> {
        self.send_empty::<Value>(Method::DELETE, &format!("/nodes/{}/", id), None).await
    }

    async fn list_connections(&self) -> ApiResult<Vec<Connection>> {
        self.get_json("/connections/").await
    }

    async fn create_connection(&self, connection: &NewConnection) -> ApiResult<Connection> {
        self.send_json(Method::POST, "/connections/", connection).await
    }

    async fn update_connection(&self, id: ConnectionId, patch: &ConnectionPatch) -> ApiResult<Connection> {
        self.send_json(Method::PATCH, &format!("/connections/{}/", id), patch).await
    }

    async fn delete_connection(&self, id: ConnectionId) -> ApiResult<()> {
        self.send_empty::<Value>(Method::DELETE, &format!("/connections/{}/", id), None).await
    }

    async fn list_logics(&self) -> ApiResult<Logics> {
        self.get_json("/logics/").await
    }

    async fn list_countries(&self) -> ApiResult<Countries> {
        self.get_json("/countries/").await
    }

    async fn list_timezones(&self) -> ApiResult<Timezones> {
        self.get_json("/timezones/").await
    }

    async fn get_variable(&self, name: &str) -> ApiResult<Option<Value>> {
        match self.get_json::<VariableBody>(&format!("/variables/{}/", name)).await {
            Ok(body) => Ok(Some(body.value)),
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_variable(&self, name: &str, value: &Value) -> ApiResult<()> {
        let body = json!({ "name": name, "value": value });
        self.send_empty(Method::POST, "/variables/", Some(&body)).await
    }

    async fn update_variable(&self, name: &str, value: &Value) -> ApiResult<()> {
        let body = json!({ "value": value });
        self.send_empty(Method::PATCH, &format!("/variables/{}/", name), Some(&body)).await
    }
}
