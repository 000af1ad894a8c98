use tracing::warn;
use crate::canvas::geometry::{anchor_position, curve_path, slot_offset, CurveStyle, Point};
use crate::model::{ConnectionId, End, Graph, NodeId, SlotKind};

/// In-progress gesture the renderer has to draw on top of the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Pose {
    /// One end of an existing connection follows the cursor.
    DetachedEnd {
        connection: ConnectionId,
        end: End,
        cursor: Point,
    },
    /// A new connection is being dragged out of a free slot.
    NewConnection {
        node: NodeId,
        kind: SlotKind,
        slot: String,
        cursor: Point,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotMark {
    pub name: String,
    pub center: Point,
}

/// One node box, in node-local coordinates under `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGroup {
    pub node: NodeId,
    pub origin: Point,
    pub name: String,
    pub inputs: Vec<SlotMark>,
    pub outputs: Vec<SlotMark>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// `None` for the curve of a connection still being created.
    pub connection: Option<ConnectionId>,
    pub from: Point,
    pub to: Point,
    pub data: String,
}

/// Everything currently drawn on the canvas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub groups: Vec<NodeGroup>,
    pub paths: Vec<Curve>,
    pub style: CurveStyle,
}

impl Scene {
    pub fn new(style: CurveStyle) -> Self {
        Self {
            groups: Vec::new(),
            paths: Vec::new(),
            style,
        }
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.paths.clear();
    }

    /// Drop everything drawn so far and draw `graph` plus the gesture pose.
    pub fn rebuild(&mut self, graph: &Graph, pose: Option<&Pose>) {
        self.clear();

        for connection in graph.connections.values() {
            let source = anchor_position(graph, connection.source, SlotKind::Output, &connection.source_key);
            let dest = anchor_position(graph, connection.dest, SlotKind::Input, &connection.dest_key);

            let (mut from, mut to) = match (source, dest) {
                (Some(s), Some(d)) => (s, d),
                _ => {
                    warn!(connection_id = connection.id, "Connection endpoint has no anchor, not drawn");
                    continue;
                }
            };
            if let Some(Pose::DetachedEnd { connection: id, end, cursor }) = pose {
                if *id == connection.id {
                    match end {
                        End::Source => from = *cursor,
                        End::Dest => to = *cursor,
                    }
                }
            }
            self.push_curve(Some(connection.id), from, to);
        }

        if let Some(Pose::NewConnection { node, kind, slot, cursor }) = pose {
            match anchor_position(graph, *node, *kind, slot) {
                Some(anchor) => match kind {
                    SlotKind::Output => self.push_curve(None, anchor, *cursor),
                    SlotKind::Input => self.push_curve(None, *cursor, anchor),
                },
                None => warn!(node_id = *node, slot = %slot, "New connection anchor vanished"),
            }
        }

        for node in graph.nodes.values() {
            let marks = |kind: SlotKind| {
                node.slots(kind)
                    .iter()
                    .enumerate()
                    .map(|(i, name)| SlotMark {
                        name: name.clone(),
                        center: slot_offset(kind, i),
                    })
                    .collect::<Vec<_>>()
            };
            self.groups.push(NodeGroup {
                node: node.id,
                origin: Point::new(node.pos_x, node.pos_y),
                name: node.name.clone(),
                inputs: marks(SlotKind::Input),
                outputs: marks(SlotKind::Output),
            });
        }
    }

    fn push_curve(&mut self, connection: Option<ConnectionId>, from: Point, to: Point) {
        self.paths.push(Curve {
            connection,
            from,
            to,
            data: curve_path(from, to, self.style),
        });
    }

    pub fn group(&self, node: NodeId) -> Option<&NodeGroup> {
        self.groups.iter().find(|g| g.node == node)
    }
}
