use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value, json};
use crate::api::{ApiError, ApiResult, FieldErrors, GraphApi};
use crate::model::schema::{parse_clock_time, Countries, FieldKind, LogicClass, Logics, Timezones};
use crate::model::{
    Connection, ConnectionId, ConnectionPatch, NewConnection, NewNode, Node, NodeId, NodePatch,
};

/// A request as the backend received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

struct LogicEntry {
    class: LogicClass,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

/// In-process backend with the same REST semantics as the real server.
pub struct MemoryApi {
    nodes: DashMap<NodeId, Node>,
    connections: DashMap<ConnectionId, Connection>,
    variables: DashMap<String, Value>,
    logics: DashMap<String, LogicEntry>,
    countries: Countries,
    timezones: Timezones,
    next_node_id: AtomicU64,
    next_connection_id: AtomicU64,
    offline: AtomicBool,
    failing_routes: DashMap<(&'static str, String), u16>,
    calls: Mutex<Vec<Call>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            connections: DashMap::new(),
            variables: DashMap::new(),
            logics: DashMap::new(),
            countries: Countries::new(),
            timezones: Timezones::new(),
            next_node_id: AtomicU64::new(1),
            next_connection_id: AtomicU64::new(1),
            offline: AtomicBool::new(false),
            failing_routes: DashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register a logic class. Nodes of this class get the given slots.
    pub fn with_logic(self, key: &str, class: LogicClass, inputs: &[&str], outputs: &[&str]) -> Self {
        self.logics.insert(
            key.to_string(),
            LogicEntry {
                class,
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_country(mut self, code: &str, country: crate::model::schema::Country) -> Self {
        self.countries.insert(code.to_string(), country);
        self
    }

    pub fn with_timezone(mut self, name: &str, label: &str) -> Self {
        self.timezones.push((name.to_string(), label.to_string()));
        self
    }

    /// Insert nodes and connections as-is, bypassing validation.
    pub fn seed(&self, nodes: Vec<Node>, connections: Vec<Connection>) {
        for node in nodes {
            self.next_node_id.fetch_max(node.id + 1, Ordering::SeqCst);
            self.nodes.insert(node.id, node);
        }
        for connection in connections {
            self.next_connection_id.fetch_max(connection.id + 1, Ordering::SeqCst);
            self.connections.insert(connection.id, connection);
        }
    }

    pub fn set_variable(&self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    /// Make every call fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make one route answer with the given status.
    pub fn fail_route(&self, method: &'static str, path: &str, status: u16) {
        self.failing_routes.insert((method, path.to_string()), status);
    }

    pub fn clear_failures(&self) {
        self.failing_routes.clear();
    }

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id).map(|n| n.value().clone())
    }

    pub fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.get(&id).map(|c| c.value().clone())
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name).map(|v| v.value().clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, method: &str, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.method != "GET").collect()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record<B: Serialize>(&self, method: &'static str, path: String, body: Option<&B>) -> ApiResult<()> {
        let body = body.map(|b| serde_json::to_value(b).unwrap_or(Value::Null));
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call { method, path: path.clone(), body });
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("backend unreachable".to_string()));
        }
        if let Some(status) = self.failing_routes.get(&(method, path)) {
            return Err(match *status {
                404 => ApiError::NotFound,
                status => ApiError::Status { status, body: String::new() },
            });
        }
        Ok(())
    }

    fn validate_settings(&self, logic_class: &str, settings: &Map<String, Value>, errors: &mut FieldErrors) {
        let Some(entry) = self.logics.get(logic_class) else {
            return;
        };
        for (key, field) in &entry.class.settings_fields {
            let Some(value) = settings.get(key) else {
                continue;
            };
            let path = format!("settings.{}", key);
            match field.kind {
                FieldKind::Integer { min, max } => match value.as_i64() {
                    None => errors.add(&path, "A valid integer is required."),
                    Some(v) => {
                        if let Some(min) = min.filter(|m| v < *m) {
                            errors.add(&path, format!("Ensure this value is greater than or equal to {}.", min));
                        }
                        if let Some(max) = max.filter(|m| v > *m) {
                            errors.add(&path, format!("Ensure this value is less than or equal to {}.", max));
                        }
                    }
                },
                FieldKind::Time => {
                    if value.as_str().and_then(parse_clock_time).is_none() {
                        errors.add(&path, "Enter a valid time.");
                    }
                }
                FieldKind::String | FieldKind::Password => {
                    if !value.is_string() {
                        errors.add(&path, "Not a valid string.");
                    }
                }
            }
        }
    }

    fn sorted_nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.nodes.iter().map(|n| n.value().clone()).collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        nodes
    }

    fn check_endpoints(&self, source: NodeId, dest: NodeId, errors: &mut FieldErrors) {
        if !self.nodes.contains_key(&source) {
            errors.add("source", format!("Invalid pk \"{}\" - object does not exist.", source));
        }
        if !self.nodes.contains_key(&dest) {
            errors.add("dest", format!("Invalid pk \"{}\" - object does not exist.", dest));
        }
    }
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

fn no_body() -> Option<&'static Value> {
    None
}

#[async_trait]
impl GraphApi for MemoryApi {
    async fn list_nodes(&self) -> ApiResult<Vec<Node>> {
        self.record("GET", "/nodes/".to_string(), no_body())?;
        Ok(self.sorted_nodes())
    }

    async fn create_node(&self, node: &NewNode) -> ApiResult<Node> {
        self.record("POST", "/nodes/".to_string(), Some(node))?;
        let mut errors = FieldErrors::new();
        if node.name.trim().is_empty() {
            errors.add("name", "This field may not be blank.");
        }
        if !self.logics.contains_key(&node.logic_class) {
            errors.add("logic_class", "Invalid logic class!");
        }
        self.validate_settings(&node.logic_class, &node.settings, &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let (inputs, outputs) = self
            .logics
            .get(&node.logic_class)
            .map(|e| (e.inputs.clone(), e.outputs.clone()))
            .unwrap_or_default();
        let created = Node {
            id: self.next_node_id.fetch_add(1, Ordering::SeqCst),
            name: node.name.clone(),
            logic_class: node.logic_class.clone(),
            pos_x: node.pos_x,
            pos_y: node.pos_y,
            inputs,
            outputs,
            settings: node.settings.clone(),
            state: json!({}),
        };
        self.nodes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_node(&self, id: NodeId, patch: &NodePatch) -> ApiResult<Node> {
        self.record("PATCH", format!("/nodes/{}/", id), Some(patch))?;
        let mut node = self.node(id).ok_or(ApiError::NotFound)?;

        let mut errors = FieldErrors::new();
        if patch.logic_class.is_some() {
            errors.add("logic_class", "Logic class may not be changed!");
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            errors.add("name", "This field may not be blank.");
        }
        if let Some(settings) = &patch.settings {
            self.validate_settings(&node.logic_class, settings, &mut errors);
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        if let Some(name) = &patch.name {
            node.name = name.clone();
        }
        if let Some(settings) = &patch.settings {
            node.settings = settings.clone();
        }
        if let Some(x) = patch.pos_x {
            node.pos_x = x;
        }
        if let Some(y) = patch.pos_y {
            node.pos_y = y;
        }
        self.nodes.insert(id, node.clone());
        Ok(node)
    }

    async fn delete_node(&self, id: NodeId) -> ApiResult<()> {
        self.record("DELETE", format!("/nodes/{}/", id), no_body())?;
        self.nodes.remove(&id).ok_or(ApiError::NotFound)?;
        self.connections.retain(|_, c| !c.touches(id));
        Ok(())
    }

    async fn list_connections(&self) -> ApiResult<Vec<Connection>> {
        self.record("GET", "/connections/".to_string(), no_body())?;
        let mut connections: Vec<Connection> = self.connections.iter().map(|c| c.value().clone()).collect();
        connections.sort_by_key(|c| c.id);
        Ok(connections)
    }

    async fn create_connection(&self, connection: &NewConnection) -> ApiResult<Connection> {
        self.record("POST", "/connections/".to_string(), Some(connection))?;
        let mut errors = FieldErrors::new();
        self.check_endpoints(connection.source, connection.dest, &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        let created = Connection {
            id: self.next_connection_id.fetch_add(1, Ordering::SeqCst),
            source: connection.source,
            source_key: connection.source_key.clone(),
            dest: connection.dest,
            dest_key: connection.dest_key.clone(),
        };
        self.connections.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_connection(&self, id: ConnectionId, patch: &ConnectionPatch) -> ApiResult<Connection> {
        self.record("PATCH", format!("/connections/{}/", id), Some(patch))?;
        let mut connection = self.connection(id).ok_or(ApiError::NotFound)?;
        patch.apply_to(&mut connection);
        let mut errors = FieldErrors::new();
        self.check_endpoints(connection.source, connection.dest, &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        self.connections.insert(id, connection.clone());
        Ok(connection)
    }

    async fn delete_connection(&self, id: ConnectionId) -> ApiResult<()> {
        self.record("DELETE", format!("/connections/{}/", id), no_body())?;
        self.connections.remove(&id).map(|_| ()).ok_or(ApiError::NotFound)
    }

    async fn list_logics(&self) -> ApiResult<Logics> {
        self.record("GET", "/logics/".to_string(), no_body())?;
        Ok(self
            .logics
            .iter()
            .map(|e| (e.key().clone(), e.value().class.clone()))
            .collect())
    }

    async fn list_countries(&self) -> ApiResult<Countries> {
        self.record("GET", "/countries/".to_string(), no_body())?;
        Ok(self.countries.clone())
    }

    async fn list_timezones(&self) -> ApiResult<Timezones> {
        self.record("GET", "/timezones/".to_string(), no_body())?;
        Ok(self.timezones.clone())
    }

    async fn get_variable(&self, name: &str) -> ApiResult<Option<Value>> {
        match self.record("GET", format!("/variables/{}/", name), no_body()) {
            Err(ApiError::NotFound) => return Ok(None),
            other => other?,
        }
        Ok(self.variable(name))
    }

    async fn create_variable(&self, name: &str, value: &Value) -> ApiResult<()> {
        let body = json!({ "name": name, "value": value });
        self.record("POST", "/variables/".to_string(), Some(&body))?;
        if self.variables.contains_key(name) {
            return Err(ApiError::Validation(
                FieldErrors::new().with("name", "variable with this name already exists."),
            ));
        }
        self.variables.insert(name.to_string(), value.clone());
        Ok(())
    }

    async fn update_variable(&self, name: &str, value: &Value) -> ApiResult<()> {
        let body = json!({ "value": value });
        self.record("PATCH", format!("/variables/{}/", name), Some(&body))?;
        let mut existing = self.variables.get_mut(name).ok_or(ApiError::NotFound)?;
        *existing = value.clone();
        Ok(())
    }
}
