use crate::model::{Connection, ConnectionId, Graph, Node, NodeId};
use serde_json::{Map, Value};

pub struct GraphBuilder {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    next_connection_id: ConnectionId,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            next_connection_id: 1,
        }
    }

    pub fn node(self, id: NodeId, name: &str) -> NodeBuilder {
        NodeBuilder {
            graph_builder: self,
            node: Node {
                id,
                name: name.to_string(),
                logic_class: String::new(),
                pos_x: 0.0,
                pos_y: 0.0,
                inputs: Vec::new(),
                outputs: Vec::new(),
                settings: Map::new(),
                state: Value::Null,
            },
        }
    }

    /// Connect `source.source_key` to `dest.dest_key`, assigning the next connection id.
    pub fn connect(mut self, source: NodeId, source_key: &str, dest: NodeId, dest_key: &str) -> Self {
        let id = self.next_connection_id;
        self.next_connection_id += 1;
        self.connections.push(Connection {
            id,
            source,
            source_key: source_key.to_string(),
            dest,
            dest_key: dest_key.to_string(),
        });
        self
    }

    pub fn build(self) -> Graph {
        Graph::from_lists(self.nodes, self.connections)
    }

    /// Nodes and connections as the list endpoints would return them.
    pub fn into_lists(self) -> (Vec<Node>, Vec<Connection>) {
        (self.nodes, self.connections)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NodeBuilder {
    graph_builder: GraphBuilder,
    node: Node,
}

impl NodeBuilder {
    pub fn logic(mut self, logic_class: &str) -> Self {
        self.node.logic_class = logic_class.to_string();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.node.pos_x = x;
        self.node.pos_y = y;
        self
    }

    pub fn inputs(mut self, inputs: &[&str]) -> Self {
        self.node.inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn outputs(mut self, outputs: &[&str]) -> Self {
        self.node.outputs = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.node.settings.insert(key.to_string(), value.into());
        self
    }

    pub fn build(mut self) -> GraphBuilder {
        self.graph_builder.nodes.push(self.node);
        self.graph_builder
    }
}
