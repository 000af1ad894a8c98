use serde::{Deserialize, Serialize};
use crate::model::{Graph, NodeId, SlotKind};

pub const NODE_WIDTH: f64 = 200.0;
pub const NODE_HEIGHT: f64 = 150.0;
pub const NODE_CORNER_RADIUS: f64 = 4.0;
pub const SLOT_FIRST_Y: f64 = 32.0;
pub const SLOT_SPACING: f64 = 12.0;
pub const SLOT_DOT_RADIUS: f64 = 5.0;
pub const SLOT_LABEL_INSET: f64 = 8.0;
pub const SLOT_LABEL_BASELINE: f64 = 4.0;
pub const NAME_BASELINE: f64 = 16.0;
pub const FIXED_CURVE_OFFSET: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn minus(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Position of a slot dot relative to its node's top-left corner.
pub fn slot_offset(kind: SlotKind, index: usize) -> Point {
    let x = match kind {
        SlotKind::Input => 0.0,
        SlotKind::Output => NODE_WIDTH,
    };
    Point::new(x, SLOT_FIRST_Y + SLOT_SPACING * index as f64)
}

/// A connectable slot in canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub node: NodeId,
    pub kind: SlotKind,
    pub slot: String,
    pub pos: Point,
}

/// Every slot anchor of the graph: node id order, inputs before outputs.
pub fn anchors(graph: &Graph) -> Vec<Anchor> {
    let mut out = Vec::new();
    for node in graph.nodes.values() {
        let origin = Point::new(node.pos_x, node.pos_y);
        for kind in [SlotKind::Input, SlotKind::Output] {
            for (i, slot) in node.slots(kind).iter().enumerate() {
                let rel = slot_offset(kind, i);
                out.push(Anchor {
                    node: node.id,
                    kind,
                    slot: slot.clone(),
                    pos: origin.offset(rel.x, rel.y),
                });
            }
        }
    }
    out
}

pub fn anchor_position(graph: &Graph, node: NodeId, kind: SlotKind, slot: &str) -> Option<Point> {
    let node = graph.nodes.get(&node)?;
    let index = node.slots(kind).iter().position(|s| s == slot)?;
    let rel = slot_offset(kind, index);
    Some(Point::new(node.pos_x + rel.x, node.pos_y + rel.y))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveStyle {
    /// Control points offset by half the endpoint distance.
    #[default]
    HalfDistance,
    /// Control points offset by a constant.
    Fixed,
}

/// SVG path data for an S-curve from an output anchor to an input anchor.
pub fn curve_path(from: Point, to: Point, style: CurveStyle) -> String {
    let d = match style {
        CurveStyle::HalfDistance => from.distance(to) / 2.0,
        CurveStyle::Fixed => FIXED_CURVE_OFFSET,
    };
    format!(
        "M {} {} C {} {} {} {} {} {}",
        from.x,
        from.y,
        from.x + d,
        from.y,
        to.x - d,
        to.y,
        to.x,
        to.y
    )
}

/// What lies under a canvas point.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Anchor(Anchor),
    Node(NodeId),
}

/// Slot dots win over node bodies; among overlapping bodies the last drawn wins.
pub fn hit_test(graph: &Graph, point: Point) -> Option<Target> {
    if let Some(anchor) = anchors(graph)
        .into_iter()
        .find(|a| a.pos.distance(point) <= SLOT_DOT_RADIUS)
    {
        return Some(Target::Anchor(anchor));
    }
    graph
        .nodes
        .values()
        .rev()
        .find(|n| {
            point.x >= n.pos_x
                && point.x <= n.pos_x + NODE_WIDTH
                && point.y >= n.pos_y
                && point.y <= n.pos_y + NODE_HEIGHT
        })
        .map(|n| Target::Node(n.id))
}
