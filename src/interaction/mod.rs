pub mod hit;

use tracing::{debug, warn};
use uuid::Uuid;
use crate::api::ApiError;
use crate::canvas::geometry::{anchors, hit_test, Point, Target};
use crate::canvas::scene::Pose;
use crate::editor::effects::Request;
use crate::model::{Connection, ConnectionId, ConnectionPatch, End, NewConnection, NodeId, SlotKind};
use crate::state::GraphState;
use self::hit::nearest_anchor;

/// Pointer travel beyond which a press on a node becomes a drag instead of a click.
pub const DRAG_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    MovingNode {
        node: NodeId,
        /// Cursor minus node position at press time.
        offset: Point,
        origin: Point,
        started: bool,
    },
    MovingEndpoint {
        connection: ConnectionId,
        end: End,
        cursor: Point,
    },
    AddingConnection {
        node: NodeId,
        kind: SlotKind,
        slot: String,
        cursor: Point,
        /// Ticket of the create request in flight; input is ignored meanwhile.
        pending: Option<Uuid>,
    },
}

/// What the host has to do after feeding the controller an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Redraw,
    OpenEditor(NodeId),
    Request(Request),
}

#[derive(Debug)]
pub struct Controller {
    gesture: Gesture,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self { gesture: Gesture::Idle }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.gesture, Gesture::AddingConnection { pending: Some(_), .. })
    }

    /// The in-progress curve the renderer should draw, if any.
    pub fn pose(&self) -> Option<Pose> {
        match &self.gesture {
            Gesture::MovingEndpoint { connection, end, cursor } => Some(Pose::DetachedEnd {
                connection: *connection,
                end: *end,
                cursor: *cursor,
            }),
            Gesture::AddingConnection { node, kind, slot, cursor, .. } => Some(Pose::NewConnection {
                node: *node,
                kind: *kind,
                slot: slot.clone(),
                cursor: *cursor,
            }),
            _ => None,
        }
    }

    /// Press at a canvas point, dispatched to whatever lies under it.
    pub fn pointer_down(&mut self, state: &mut GraphState, cursor: Point, button: Button) -> Vec<Effect> {
        match hit_test(state.local(), cursor) {
            Some(Target::Anchor(anchor)) => self.press_anchor(state, anchor.node, anchor.kind, &anchor.slot, cursor, button),
            Some(Target::Node(node)) => self.press_node(state, node, cursor, button),
            None => Vec::new(),
        }
    }

    pub fn press_node(&mut self, state: &mut GraphState, node: NodeId, cursor: Point, button: Button) -> Vec<Effect> {
        if button != Button::Left || self.gesture != Gesture::Idle {
            return Vec::new();
        }
        let Some(n) = state.local().nodes.get(&node) else {
            return Vec::new();
        };
        self.gesture = Gesture::MovingNode {
            node,
            offset: cursor.minus(Point::new(n.pos_x, n.pos_y)),
            origin: cursor,
            started: false,
        };
        Vec::new()
    }

    pub fn press_anchor(
        &mut self,
        state: &mut GraphState,
        node: NodeId,
        kind: SlotKind,
        slot: &str,
        cursor: Point,
        button: Button,
    ) -> Vec<Effect> {
        if button != Button::Left || self.gesture != Gesture::Idle {
            return Vec::new();
        }
        let end = match kind {
            SlotKind::Input => End::Dest,
            SlotKind::Output => End::Source,
        };
        let attached = state.local().connection_at(end, node, slot).map(|c| c.id);
        self.gesture = match attached {
            Some(connection) => {
                state.pin_connection(connection);
                Gesture::MovingEndpoint { connection, end, cursor }
            }
            None => Gesture::AddingConnection {
                node,
                kind,
                slot: slot.to_string(),
                cursor,
                pending: None,
            },
        };
        vec![Effect::Redraw]
    }

    pub fn pointer_move(&mut self, state: &mut GraphState, cursor: Point) -> Vec<Effect> {
        match &mut self.gesture {
            Gesture::Idle => Vec::new(),
            Gesture::MovingNode { node, offset, origin, started } => {
                let node = *node;
                if !*started && cursor.distance(*origin) > DRAG_THRESHOLD {
                    *started = true;
                    state.pin_node(node);
                }
                if !*started {
                    return Vec::new();
                }
                let pos = cursor.minus(*offset);
                if !state.set_node_position(node, pos.x, pos.y) {
                    warn!(node_id = node, "Dragged node disappeared");
                    state.release_node(node);
                    self.gesture = Gesture::Idle;
                }
                vec![Effect::Redraw]
            }
            Gesture::MovingEndpoint { cursor: current, .. } => {
                *current = cursor;
                vec![Effect::Redraw]
            }
            Gesture::AddingConnection { pending: Some(_), .. } => Vec::new(),
            Gesture::AddingConnection { cursor: current, .. } => {
                *current = cursor;
                vec![Effect::Redraw]
            }
        }
    }

    pub fn pointer_up(&mut self, state: &mut GraphState, cursor: Point, button: Button) -> Vec<Effect> {
        if button != Button::Left || self.is_waiting() {
            return Vec::new();
        }
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => Vec::new(),
            Gesture::MovingNode { node, origin, started: false, .. } if cursor.distance(origin) <= DRAG_THRESHOLD => {
                vec![Effect::OpenEditor(node)]
            }
            Gesture::MovingNode { node, offset, started, .. } => {
                // Released far from the press point without a move in between.
                if !started {
                    state.pin_node(node);
                }
                let pos = cursor.minus(offset);
                state.set_node_position(node, pos.x, pos.y);
                vec![
                    Effect::Redraw,
                    Effect::Request(Request::MoveNode { node, x: pos.x, y: pos.y }),
                ]
            }
            Gesture::MovingEndpoint { connection, end, .. } => self.drop_endpoint(state, connection, end, cursor),
            Gesture::AddingConnection { node, kind, slot, .. } => self.drop_new_connection(state, node, kind, slot, cursor),
        }
    }

    fn drop_endpoint(&mut self, state: &mut GraphState, connection: ConnectionId, end: End, cursor: Point) -> Vec<Effect> {
        let all = anchors(state.local());
        let request = match nearest_anchor(&all, end.slot_kind(), cursor) {
            Some(target) => {
                let patch = ConnectionPatch::reattach(end, target.node, &target.slot);
                match state.connection_mut(connection) {
                    Some(c) => patch.apply_to(c),
                    None => {
                        state.release_connection(connection);
                        return vec![Effect::Redraw];
                    }
                }
                Request::ReattachConnection { connection, patch }
            }
            None => {
                state.remove_connection(connection);
                Request::DeleteConnection { connection }
            }
        };
        vec![Effect::Redraw, Effect::Request(request)]
    }

    fn drop_new_connection(
        &mut self,
        state: &mut GraphState,
        node: NodeId,
        kind: SlotKind,
        slot: String,
        cursor: Point,
    ) -> Vec<Effect> {
        let all = anchors(state.local());
        let Some(target) = nearest_anchor(&all, kind.opposite(), cursor) else {
            return vec![Effect::Redraw];
        };
        let connection = match kind {
            SlotKind::Output => NewConnection {
                source: node,
                source_key: slot.clone(),
                dest: target.node,
                dest_key: target.slot.clone(),
            },
            SlotKind::Input => NewConnection {
                source: target.node,
                source_key: target.slot.clone(),
                dest: node,
                dest_key: slot.clone(),
            },
        };
        let ticket = Uuid::new_v4();
        self.gesture = Gesture::AddingConnection {
            node,
            kind,
            slot,
            cursor: target.pos,
            pending: Some(ticket),
        };
        vec![
            Effect::Redraw,
            Effect::Request(Request::CreateConnection { ticket, connection }),
        ]
    }

    /// Resolve a create request. Completions for any ticket other than the
    /// pending one are stale and dropped.
    pub fn connection_created(
        &mut self,
        state: &mut GraphState,
        ticket: Uuid,
        result: Result<Connection, ApiError>,
    ) -> Vec<Effect> {
        match &self.gesture {
            Gesture::AddingConnection { pending: Some(pending), .. } if *pending == ticket => {}
            _ => {
                debug!(%ticket, "Dropping stale connection create result");
                return Vec::new();
            }
        }
        self.gesture = Gesture::Idle;
        match result {
            Ok(connection) => state.upsert_connection(connection),
            Err(e) => warn!(%ticket, error = %e, "Connection create failed, abandoned"),
        }
        vec![Effect::Redraw]
    }
}
