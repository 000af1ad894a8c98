pub mod builder;
pub mod schema;
pub mod settings;

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

pub type NodeId = u64;
pub type ConnectionId = u64;

/// A positioned box with named input/output slots, as served by `/api/v1/nodes/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub logic_class: String,
    #[serde(default)]
    pub pos_x: f64,
    #[serde(default)]
    pub pos_y: f64,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub state: Value,
}

impl Node {
    /// Equality used by the reconciler. Settings and runtime state are not compared.
    pub fn same_shape(&self, other: &Node) -> bool {
        self.name == other.name
            && self.logic_class == other.logic_class
            && self.pos_x == other.pos_x
            && self.pos_y == other.pos_y
            && self.inputs == other.inputs
            && self.outputs == other.outputs
    }

    pub fn slots(&self, kind: SlotKind) -> &[String] {
        match kind {
            SlotKind::Input => &self.inputs,
            SlotKind::Output => &self.outputs,
        }
    }
}

/// A directed edge from `source`'s output slot to `dest`'s input slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: NodeId,
    pub source_key: String,
    pub dest: NodeId,
    pub dest_key: String,
}

impl Connection {
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.dest == node
    }

    /// The node and slot this connection is attached to on the given side.
    pub fn endpoint(&self, end: End) -> (NodeId, &str) {
        match end {
            End::Source => (self.source, &self.source_key),
            End::Dest => (self.dest, &self.dest_key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotKind {
    Input,
    Output,
}

impl SlotKind {
    pub fn opposite(self) -> Self {
        match self {
            SlotKind::Input => SlotKind::Output,
            SlotKind::Output => SlotKind::Input,
        }
    }
}

/// One side of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Source,
    Dest,
}

impl End {
    /// The slot kind an end of this side must be attached to.
    pub fn slot_kind(self) -> SlotKind {
        match self {
            End::Source => SlotKind::Output,
            End::Dest => SlotKind::Input,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewNode {
    pub name: String,
    pub logic_class: String,
    pub settings: Map<String, Value>,
    pub pos_x: f64,
    pub pos_y: f64,
}

/// Partial node update. Absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_y: Option<f64>,
}

impl NodePatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            pos_x: Some(x),
            pos_y: Some(y),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewConnection {
    pub source: NodeId,
    pub source_key: String,
    pub dest: NodeId,
    pub dest_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_key: Option<String>,
}

impl ConnectionPatch {
    /// Re-point one end of a connection at another node and slot.
    pub fn reattach(end: End, node: NodeId, slot: &str) -> Self {
        match end {
            End::Source => Self {
                source: Some(node),
                source_key: Some(slot.to_string()),
                ..Self::default()
            },
            End::Dest => Self {
                dest: Some(node),
                dest_key: Some(slot.to_string()),
                ..Self::default()
            },
        }
    }

    pub fn apply_to(&self, connection: &mut Connection) {
        if let Some(source) = self.source {
            connection.source = source;
        }
        if let Some(key) = &self.source_key {
            connection.source_key = key.clone();
        }
        if let Some(dest) = self.dest {
            connection.dest = dest;
        }
        if let Some(key) = &self.dest_key {
            connection.dest_key = key.clone();
        }
    }
}

/// A snapshot of nodes and connections keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub nodes: BTreeMap<NodeId, Node>,
    pub connections: BTreeMap<ConnectionId, Connection>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lists(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
            connections: connections.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// First connection attached to exactly this node and slot on the given side.
    pub fn connection_at(&self, end: End, node: NodeId, slot: &str) -> Option<&Connection> {
        self.connections
            .values()
            .find(|c| c.endpoint(end) == (node, slot))
    }
}
