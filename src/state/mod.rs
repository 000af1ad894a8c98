use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use crate::model::{Connection, ConnectionId, Graph, Node, NodeId};

/// What a merge changed in the local snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Server snapshot plus the locally edited snapshot the canvas draws.
///
/// Entities are pinned while a local edit owns them (a drag, or a PATCH in
/// flight). Merges skip pinned entities and keep their previous server value
/// as the baseline, so a server change that arrived meanwhile is applied by
/// the first merge after release. Pins are counted per id, so an entity
/// stays pinned until every owner has released it.
#[derive(Debug, Default)]
pub struct GraphState {
    server: Graph,
    local: Graph,
    pinned_nodes: HashMap<NodeId, usize>,
    pinned_connections: HashMap<ConnectionId, usize>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local(&self) -> &Graph {
        &self.local
    }

    pub fn server(&self) -> &Graph {
        &self.server
    }

    pub fn merge(&mut self, nodes: Vec<Node>, connections: Vec<Connection>) -> MergeReport {
        let mut report = MergeReport::default();

        let nodes = merge_entities(
            &self.server.nodes,
            nodes.into_iter().map(|n| (n.id, n)).collect(),
            &mut self.local.nodes,
            &self.pinned_nodes,
            Node::same_shape,
            &mut report,
        );
        let connections = merge_entities(
            &self.server.connections,
            connections.into_iter().map(|c| (c.id, c)).collect(),
            &mut self.local.connections,
            &self.pinned_connections,
            |a, b| a == b,
            &mut report,
        );

        self.server = Graph { nodes, connections };
        debug!(
            inserted = report.inserted,
            updated = report.updated,
            removed = report.removed,
            "Merged server snapshot"
        );
        report
    }

    pub fn pin_node(&mut self, id: NodeId) {
        *self.pinned_nodes.entry(id).or_default() += 1;
    }

    pub fn release_node(&mut self, id: NodeId) {
        release(&mut self.pinned_nodes, id);
    }

    pub fn is_node_pinned(&self, id: NodeId) -> bool {
        self.pinned_nodes.contains_key(&id)
    }

    pub fn pin_connection(&mut self, id: ConnectionId) {
        *self.pinned_connections.entry(id).or_default() += 1;
    }

    pub fn release_connection(&mut self, id: ConnectionId) {
        release(&mut self.pinned_connections, id);
    }

    pub fn is_connection_pinned(&self, id: ConnectionId) -> bool {
        self.pinned_connections.contains_key(&id)
    }

    pub fn set_node_position(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        match self.local.nodes.get_mut(&id) {
            Some(node) => {
                node.pos_x = x;
                node.pos_y = y;
                true
            }
            None => false,
        }
    }

    pub fn upsert_node(&mut self, node: Node) {
        self.local.nodes.insert(node.id, node);
    }

    /// Remove a node and every connection touching it from the local snapshot.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let removed = self.local.nodes.remove(&id);
        self.local.connections.retain(|_, c| !c.touches(id));
        removed
    }

    pub fn upsert_connection(&mut self, connection: Connection) {
        self.local.connections.insert(connection.id, connection);
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.local.connections.get_mut(&id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        self.local.connections.remove(&id)
    }

    /// Throw away a local edit of a node and show the server's version again.
    pub fn revert_node(&mut self, id: NodeId) {
        match self.server.nodes.get(&id) {
            Some(node) => {
                self.local.nodes.insert(id, node.clone());
            }
            None => {
                self.local.nodes.remove(&id);
            }
        }
    }
}

fn release<K: std::hash::Hash + Eq>(pins: &mut HashMap<K, usize>, id: K) {
    if let Some(count) = pins.get_mut(&id) {
        *count -= 1;
        if *count == 0 {
            pins.remove(&id);
        }
    }
}

/// Diff `incoming` against `previous`, apply changes to `local`, and return
/// the snapshot to store as the new server baseline.
fn merge_entities<K, V, F>(
    previous: &BTreeMap<K, V>,
    mut incoming: BTreeMap<K, V>,
    local: &mut BTreeMap<K, V>,
    pinned: &HashMap<K, usize>,
    same: F,
    report: &mut MergeReport,
) -> BTreeMap<K, V>
where
    K: Ord + Copy + std::hash::Hash,
    V: Clone,
    F: Fn(&V, &V) -> bool,
{
    let mut deferred = Vec::new();

    for (id, value) in &incoming {
        if pinned.contains_key(id) {
            deferred.push(*id);
            continue;
        }
        match previous.get(id) {
            None => {
                local.insert(*id, value.clone());
                report.inserted += 1;
            }
            Some(old) if !same(old, value) => {
                local.insert(*id, value.clone());
                report.updated += 1;
            }
            Some(_) => {}
        }
    }

    for (id, old) in previous {
        if incoming.contains_key(id) {
            continue;
        }
        if pinned.contains_key(id) {
            incoming.insert(*id, old.clone());
        } else if local.remove(id).is_some() {
            report.removed += 1;
        }
    }

    // Pinned entities keep their old baseline, or none if they are new.
    for id in deferred {
        match previous.get(&id) {
            Some(old) => {
                incoming.insert(id, old.clone());
            }
            None => {
                incoming.remove(&id);
            }
        }
    }

    incoming
}
