use nodecanvas::api::http::{classify_failure, HttpApi, CSRF_HEADER};
use nodecanvas::api::{ApiError, FieldErrors, GraphApi};
use nodecanvas::model::NodePatch;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one HTTP exchange with a canned answer and hand back the raw request.
async fn one_shot_server(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let base_url = format!("http://{}", listener.local_addr().expect("no local addr"));
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept failed");
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.expect("read failed");
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.expect("write failed");
        String::from_utf8_lossy(&raw).into_owned()
    });
    (base_url, handle)
}

#[test]
fn test_urls_are_prefixed() {
    let api = HttpApi::new("http://example.test/", Duration::from_secs(1)).expect("client");
    assert_eq!(api.url("/nodes/"), "http://example.test/api/v1/nodes/");
}

#[test]
fn test_failure_classification() {
    assert!(matches!(classify_failure(StatusCode::NOT_FOUND, ""), ApiError::NotFound));

    let body = r#"{"name": ["This field may not be blank."], "settings": {"on_hours": ["Ensure this value is less than or equal to 24."]}}"#;
    match classify_failure(StatusCode::BAD_REQUEST, body) {
        ApiError::Validation(errors) => {
            assert_eq!(errors.get("name"), ["This field may not be blank."]);
            assert_eq!(errors.get("settings.on_hours").len(), 1);
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    match classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom") {
        ApiError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {:?}", other),
    }

    // A 400 without a JSON object stays opaque.
    assert!(matches!(
        classify_failure(StatusCode::BAD_REQUEST, "<html>"),
        ApiError::Status { status: 400, .. }
    ));
}

#[test]
fn test_field_errors_display() {
    let errors = FieldErrors::new().with("name", "Required.").with("settings.mode", "Bad choice.");
    assert_eq!(errors.to_string(), "name: Required.; settings.mode: Bad choice.");
}

#[tokio::test]
async fn test_patch_carries_csrf_token_and_json_body() {
    let (base_url, server) = one_shot_server(
        "200 OK",
        r#"{"id": 1, "name": "Lamp", "logic_class": "logics.lamp.Lamp", "pos_x": 50.0, "pos_y": 30.0}"#,
    )
    .await;
    let api = HttpApi::new(&base_url, Duration::from_secs(5))
        .expect("client")
        .with_csrf_token("secret-token")
        .with_session_cookie("sessionid=abc");

    let node = api.update_node(1, &NodePatch::position(50.0, 30.0)).await.expect("patch failed");
    let request = server.await.expect("server task failed");

    assert_eq!((node.pos_x, node.pos_y), (50.0, 30.0));
    assert!(node.inputs.is_empty());
    assert!(request.starts_with("PATCH /api/v1/nodes/1/ HTTP/1.1"));
    let lower = request.to_ascii_lowercase();
    assert!(lower.contains(&format!("{}: secret-token", CSRF_HEADER.to_ascii_lowercase())));
    assert!(lower.contains("cookie: sessionid=abc"));
    let body = &request[request.find("\r\n\r\n").expect("no body") + 4..];
    let sent: serde_json::Value = serde_json::from_str(body).expect("body is not JSON");
    assert_eq!(sent, json!({"pos_x": 50.0, "pos_y": 30.0}));
}

#[tokio::test]
async fn test_get_does_not_send_csrf_token() {
    let (base_url, server) = one_shot_server("200 OK", "[]").await;
    let api = HttpApi::new(&base_url, Duration::from_secs(5))
        .expect("client")
        .with_csrf_token("secret-token");

    let nodes = api.list_nodes().await.expect("list failed");
    let request = server.await.expect("server task failed");

    assert!(nodes.is_empty());
    assert!(request.starts_with("GET /api/v1/nodes/ HTTP/1.1"));
    assert!(!request.to_ascii_lowercase().contains("x-csrftoken"));
}

#[tokio::test]
async fn test_missing_variable_reads_as_unset() {
    let (base_url, server) = one_shot_server("404 Not Found", r#"{"detail": "Not found."}"#).await;
    let api = HttpApi::new(&base_url, Duration::from_secs(5)).expect("client");

    let value = api.get_variable("countrycode").await.expect("404 should not be an error");
    let request = server.await.expect("server task failed");

    assert_eq!(value, None);
    assert!(request.starts_with("GET /api/v1/variables/countrycode/ HTTP/1.1"));
}

#[tokio::test]
async fn test_validation_error_body_is_parsed() {
    let (base_url, server) = one_shot_server(
        "400 Bad Request",
        r#"{"settings": {"interval": ["A valid integer is required."]}}"#,
    )
    .await;
    let api = HttpApi::new(&base_url, Duration::from_secs(5)).expect("client");

    let result = api.update_node(3, &NodePatch::default()).await;
    server.await.expect("server task failed");

    match result {
        Err(ApiError::Validation(errors)) => {
            assert_eq!(errors.get("settings.interval"), ["A valid integer is required."]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("no local addr");
    drop(listener);
    let api = HttpApi::new(&format!("http://{}", addr), Duration::from_secs(2)).expect("client");

    assert!(matches!(api.list_connections().await, Err(ApiError::Transport(_))));
}
