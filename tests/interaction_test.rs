use nodecanvas::api::memory::MemoryApi;
use nodecanvas::canvas::geometry::{CurveStyle, Point};
use nodecanvas::dialog::Dialog;
use nodecanvas::editor::effects::{Completion, Request};
use nodecanvas::editor::session::{Session, UiEvent};
use nodecanvas::editor::Editor;
use nodecanvas::interaction::hit::nearest_anchor;
use nodecanvas::interaction::{Button, Gesture};
use nodecanvas::model::builder::GraphBuilder;
use nodecanvas::model::schema::LogicClass;
use nodecanvas::model::{Connection, End, Node, SlotKind};
use nodecanvas::sync::SyncClient;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const LAMP: &str = "logics.lamp.Lamp";

fn lamp_class() -> LogicClass {
    LogicClass {
        name: "Lamp".to_string(),
        description: String::new(),
        settings_fields: Vec::new(),
    }
}

/// Node 1 at (10,10) with output `b`, nodes 2 and 3 below each other on the right with input `in`.
fn graph() -> (Vec<Node>, Vec<Connection>) {
    GraphBuilder::new()
        .node(1, "Source").logic(LAMP).at(10.0, 10.0).inputs(&["a"]).outputs(&["b"]).build()
        .node(2, "Upper").logic(LAMP).at(400.0, 10.0).inputs(&["in"]).build()
        .node(3, "Lower").logic(LAMP).at(400.0, 200.0).inputs(&["in"]).build()
        .into_lists()
}

fn connected_graph() -> (Vec<Node>, Vec<Connection>) {
    let (nodes, _) = graph();
    let (_, connections) = GraphBuilder::new().connect(1, "b", 2, "in").into_lists();
    (nodes, connections)
}

async fn session_with(nodes: Vec<Node>, connections: Vec<Connection>) -> (Arc<MemoryApi>, Session) {
    let api = Arc::new(MemoryApi::new().with_logic(LAMP, lamp_class(), &["in"], &["out"]));
    api.seed(nodes, connections);
    let mut session = Session::new(SyncClient::new(api.clone()), CurveStyle::default());
    session.start().await.expect("startup failed");
    api.clear_calls();
    (api, session)
}

fn editor_with(nodes: Vec<Node>, connections: Vec<Connection>) -> Editor {
    let mut editor = Editor::default();
    editor.apply_snapshot(nodes, connections);
    editor
}

fn drag(session: &mut Session, from: Point, to: Point) -> Vec<Request> {
    let mut requests = session.handle_event(UiEvent::PointerDown { point: from, button: Button::Left });
    requests.extend(session.handle_event(UiEvent::PointerMove { point: to }));
    requests.extend(session.handle_event(UiEvent::PointerUp { point: to, button: Button::Left }));
    requests
}

#[tokio::test]
async fn test_drag_node_sends_one_position_patch() {
    let (api, mut session) = session_with(graph().0, Vec::new()).await;

    // Grab node 1 at offset (100,50) and drop it so its corner lands on (50,30).
    let requests = drag(&mut session, Point::new(110.0, 60.0), Point::new(150.0, 80.0));
    assert_eq!(requests, vec![Request::MoveNode { node: 1, x: 50.0, y: 30.0 }]);

    session.perform_now(requests).await;

    let patches = api.calls_to("PATCH", "/nodes/1/");
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].body, Some(json!({"pos_x": 50.0, "pos_y": 30.0})));
    assert_eq!(api.mutating_calls().len(), 1);
    assert!(session.editor().dialog().is_none());
    assert!(!session.editor().graph().is_node_pinned(1));
    let node = &session.editor().graph().local().nodes[&1];
    assert_eq!((node.pos_x, node.pos_y), (50.0, 30.0));
}

#[tokio::test]
async fn test_click_opens_editor_without_patch() {
    let (api, mut session) = session_with(graph().0, Vec::new()).await;

    // Exactly on the threshold still counts as a click.
    let requests = drag(&mut session, Point::new(110.0, 60.0), Point::new(113.0, 64.0));

    assert!(requests.is_empty());
    assert!(api.mutating_calls().is_empty());
    match session.editor().dialog() {
        Some(Dialog::Node(form)) => assert_eq!(form.name.value, "Source"),
        other => panic!("expected node dialog, got {:?}", other),
    }
    let node = &session.editor().graph().local().nodes[&1];
    assert_eq!((node.pos_x, node.pos_y), (10.0, 10.0));
}

#[tokio::test]
async fn test_release_far_from_press_without_move_is_a_drag() {
    let (api, mut session) = session_with(graph().0, Vec::new()).await;

    let mut requests = session.handle_event(UiEvent::PointerDown { point: Point::new(110.0, 60.0), button: Button::Left });
    requests.extend(session.handle_event(UiEvent::PointerUp { point: Point::new(150.0, 80.0), button: Button::Left }));

    assert_eq!(requests, vec![Request::MoveNode { node: 1, x: 50.0, y: 30.0 }]);
    assert!(session.editor().dialog().is_none());
    assert!(session.editor().graph().is_node_pinned(1));

    session.perform_now(requests).await;

    assert_eq!(api.calls_to("PATCH", "/nodes/1/").len(), 1);
    assert!(!session.editor().graph().is_node_pinned(1));
}

#[tokio::test]
async fn test_move_completion_keeps_pin_of_pending_edit() {
    let (_api, mut session) = session_with(graph().0, Vec::new()).await;

    session.handle_event(UiEvent::OpenEditDialog { node: 1 });
    session.handle_event(UiEvent::SetField { key: "name".to_string(), value: "Renamed".to_string() });
    let update = session.handle_event(UiEvent::SubmitDialog);
    assert!(matches!(update.as_slice(), [Request::UpdateNode { node: 1, .. }]));

    let moved = drag(&mut session, Point::new(110.0, 60.0), Point::new(150.0, 80.0));
    assert_eq!(moved, vec![Request::MoveNode { node: 1, x: 50.0, y: 30.0 }]);

    session.perform_now(moved).await;
    assert!(session.editor().graph().is_node_pinned(1), "update still in flight");

    session.perform_now(update).await;
    assert!(!session.editor().graph().is_node_pinned(1));
    assert_eq!(session.editor().graph().local().nodes[&1].name, "Renamed");
}

#[test]
fn test_small_jitter_then_large_move_is_a_drag() {
    let (nodes, connections) = graph();
    let mut editor = editor_with(nodes, connections);

    editor.pointer_down(Point::new(110.0, 60.0), Button::Left);
    assert!(editor.pointer_move(Point::new(111.0, 61.0)).is_empty());
    assert!(!editor.graph().is_node_pinned(1));

    editor.pointer_move(Point::new(130.0, 60.0));
    assert!(editor.graph().is_node_pinned(1));
    assert_eq!(editor.graph().local().nodes[&1].pos_x, 30.0);

    // Once started, moving back near the origin keeps dragging.
    editor.pointer_move(Point::new(111.0, 60.0));
    assert_eq!(editor.graph().local().nodes[&1].pos_x, 11.0);
}

#[test]
fn test_right_button_is_ignored() {
    let (nodes, connections) = graph();
    let mut editor = editor_with(nodes, connections);

    assert!(editor.pointer_down(Point::new(110.0, 60.0), Button::Right).is_empty());
    assert_eq!(editor.controller().gesture(), &Gesture::Idle);
}

#[test]
fn test_nearest_anchor_picks_closest_within_radius() {
    let (nodes, connections) = graph();
    let editor = editor_with(nodes, connections);
    let all = nodecanvas::canvas::anchors(editor.graph().local());

    // Input of node 2 is at (400,42), input of node 3 at (400,232).
    let hit = nearest_anchor(&all, SlotKind::Input, Point::new(405.0, 50.0)).expect("no anchor");
    assert_eq!((hit.node, hit.slot.as_str()), (2, "in"));

    // 20 units away does not qualify.
    assert!(nearest_anchor(&all, SlotKind::Input, Point::new(420.0, 42.0)).is_none());
    // Outputs are not considered when looking for inputs.
    assert!(nearest_anchor(&all, SlotKind::Input, Point::new(210.0, 42.0)).is_none());
}

#[test]
fn test_nearest_anchor_tie_goes_to_first_anchor() {
    // Two inputs 20 apart; the lower node has the smaller id.
    let (nodes, connections) = GraphBuilder::new()
        .node(1, "Lower").logic(LAMP).at(0.0, 20.0).inputs(&["in"]).build()
        .node(2, "Upper").logic(LAMP).at(0.0, 0.0).inputs(&["in"]).build()
        .into_lists();
    let editor = editor_with(nodes, connections);
    let all = nodecanvas::canvas::anchors(editor.graph().local());
    let inputs: Vec<Point> = all.iter().filter(|a| a.kind == SlotKind::Input).map(|a| a.pos).collect();
    let [first, second] = inputs.as_slice() else {
        panic!("expected two inputs, got {:?}", inputs);
    };
    let between = Point::new((first.x + second.x) / 2.0 + 10.0, (first.y + second.y) / 2.0);
    assert_eq!(between.distance(*first), between.distance(*second));

    let hit = nearest_anchor(&all, SlotKind::Input, between).expect("no anchor");

    assert_eq!(hit.node, all[0].node);
    assert_eq!(hit.node, 1);
}

#[tokio::test]
async fn test_new_connection_is_created_and_confirmed() {
    let (api, mut session) = session_with(graph().0, Vec::new()).await;

    let requests = drag(&mut session, Point::new(210.0, 42.0), Point::new(395.0, 45.0));
    let [Request::CreateConnection { connection, .. }] = requests.as_slice() else {
        panic!("expected one create request, got {:?}", requests);
    };
    assert_eq!((connection.source, connection.source_key.as_str()), (1, "b"));
    assert_eq!((connection.dest, connection.dest_key.as_str()), (2, "in"));
    assert!(session.editor().controller().is_waiting());

    session.perform_now(requests).await;

    assert!(!session.editor().controller().is_waiting());
    assert_eq!(api.calls_to("POST", "/connections/").len(), 1);
    let local = &session.editor().graph().local().connections;
    assert_eq!(local.len(), 1);
    assert_eq!(local.values().next().map(|c| c.dest), Some(2));
}

#[tokio::test]
async fn test_new_connection_dropped_in_empty_space_is_abandoned() {
    let (api, mut session) = session_with(graph().0, Vec::new()).await;

    let requests = drag(&mut session, Point::new(210.0, 42.0), Point::new(300.0, 400.0));

    assert!(requests.is_empty());
    assert_eq!(session.editor().controller().gesture(), &Gesture::Idle);
    assert!(api.mutating_calls().is_empty());
    assert!(session.editor().scene().paths.is_empty());
}

#[test]
fn test_input_is_masked_while_creation_is_pending() {
    let (nodes, connections) = graph();
    let mut editor = editor_with(nodes, connections);

    editor.pointer_down(Point::new(210.0, 42.0), Button::Left);
    let requests = editor.pointer_up(Point::new(398.0, 42.0), Button::Left);
    assert_eq!(requests.len(), 1);
    assert!(editor.controller().is_waiting());

    assert!(editor.pointer_down(Point::new(110.0, 60.0), Button::Left).is_empty());
    assert!(editor.pointer_move(Point::new(300.0, 300.0)).is_empty());
    assert!(editor.pointer_up(Point::new(300.0, 300.0), Button::Left).is_empty());
    assert!(editor.controller().is_waiting());
    assert_eq!(editor.graph().local().nodes[&1].pos_x, 10.0);
}

#[test]
fn test_stale_creation_result_is_discarded() {
    let (nodes, connections) = graph();
    let mut editor = editor_with(nodes, connections);

    editor.pointer_down(Point::new(210.0, 42.0), Button::Left);
    let requests = editor.pointer_up(Point::new(398.0, 42.0), Button::Left);
    let Some(Request::CreateConnection { ticket, connection }) = requests.into_iter().next() else {
        panic!("expected a create request");
    };
    let made = |id| Connection {
        id,
        source: connection.source,
        source_key: connection.source_key.clone(),
        dest: connection.dest,
        dest_key: connection.dest_key.clone(),
    };

    editor.complete(Completion::ConnectionCreated { ticket: Uuid::new_v4(), result: Ok(made(41)) });
    assert!(editor.graph().local().connections.is_empty());
    assert!(editor.controller().is_waiting());

    editor.complete(Completion::ConnectionCreated { ticket, result: Ok(made(42)) });
    assert!(editor.graph().local().connections.contains_key(&42));
    assert!(!editor.controller().is_waiting());

    // A repeat of the same ticket after resolution is stale too.
    editor.complete(Completion::ConnectionCreated { ticket, result: Ok(made(43)) });
    assert!(!editor.graph().local().connections.contains_key(&43));
}

#[tokio::test]
async fn test_failed_creation_is_abandoned() {
    let (api, mut session) = session_with(graph().0, Vec::new()).await;
    api.fail_route("POST", "/connections/", 500);

    let requests = drag(&mut session, Point::new(210.0, 42.0), Point::new(395.0, 45.0));
    session.perform_now(requests).await;

    assert!(!session.editor().controller().is_waiting());
    assert!(session.editor().graph().local().connections.is_empty());
}

#[tokio::test]
async fn test_detached_end_reattaches_to_nearest_input() {
    let (nodes, connections) = connected_graph();
    let (api, mut session) = session_with(nodes, connections).await;

    // Pick up the destination end at node 2's input and drop it by node 3's.
    session.handle_event(UiEvent::PointerDown { point: Point::new(400.0, 42.0), button: Button::Left });
    assert!(matches!(
        session.editor().controller().gesture(),
        Gesture::MovingEndpoint { connection: 1, end: End::Dest, .. }
    ));
    assert!(session.editor().graph().is_connection_pinned(1));
    session.handle_event(UiEvent::PointerMove { point: Point::new(390.0, 230.0) });
    let requests = session.handle_event(UiEvent::PointerUp { point: Point::new(390.0, 230.0), button: Button::Left });

    assert_eq!(session.editor().graph().local().connections[&1].dest, 3);
    session.perform_now(requests).await;

    let patches = api.calls_to("PATCH", "/connections/1/");
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].body, Some(json!({"dest": 3, "dest_key": "in"})));
    assert_eq!(api.connection(1).map(|c| c.dest), Some(3));
    assert!(!session.editor().graph().is_connection_pinned(1));
}

#[tokio::test]
async fn test_source_end_snaps_only_to_outputs() {
    let (nodes, connections) = connected_graph();
    let (_api, mut session) = session_with(nodes, connections).await;

    // Dragging the source end onto node 2's input is not a valid target.
    let requests = drag(&mut session, Point::new(210.0, 42.0), Point::new(401.0, 42.0));

    assert_eq!(requests, vec![Request::DeleteConnection { connection: 1 }]);
}

#[tokio::test]
async fn test_detached_end_dropped_in_empty_space_deletes_connection() {
    let (nodes, connections) = connected_graph();
    let (api, mut session) = session_with(nodes, connections).await;

    let requests = drag(&mut session, Point::new(400.0, 42.0), Point::new(700.0, 500.0));
    assert!(session.editor().graph().local().connections.is_empty());
    session.perform_now(requests).await;

    assert_eq!(api.calls_to("DELETE", "/connections/1/").len(), 1);
    assert!(api.connection(1).is_none());
}

#[tokio::test]
async fn test_failed_move_falls_back_to_server_position() {
    let (api, mut session) = session_with(graph().0, Vec::new()).await;
    api.set_offline(true);

    let requests = drag(&mut session, Point::new(110.0, 60.0), Point::new(150.0, 80.0));
    session.perform_now(requests).await;

    let node: &Node = &session.editor().graph().local().nodes[&1];
    assert_eq!((node.pos_x, node.pos_y), (10.0, 10.0));
}

#[test]
fn test_drag_redraws_every_move() {
    let (nodes, connections) = graph();
    let mut editor = editor_with(nodes, connections);
    let before = editor.render_count();

    editor.pointer_down(Point::new(110.0, 60.0), Button::Left);
    for step in 1..=4 {
        editor.pointer_move(Point::new(110.0 + 10.0 * step as f64, 60.0));
    }

    assert_eq!(editor.render_count(), before + 4);
    let group = editor.scene().group(1).expect("node 1 not drawn");
    assert_eq!(group.origin, Point::new(50.0, 10.0));
}
