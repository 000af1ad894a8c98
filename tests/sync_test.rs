use nodecanvas::api::memory::MemoryApi;
use nodecanvas::api::ApiError;
use nodecanvas::model::builder::GraphBuilder;
use nodecanvas::model::schema::{Country, LogicClass};
use nodecanvas::model::settings::Settings;
use nodecanvas::sync::SyncClient;
use serde_json::json;
use std::sync::Arc;

fn backend() -> Arc<MemoryApi> {
    let logic = LogicClass {
        name: "Lamp".to_string(),
        description: "Switches a lamp".to_string(),
        settings_fields: Vec::new(),
    };
    Arc::new(
        MemoryApi::new()
            .with_logic("logics.lamp.Lamp", logic, &["on"], &[])
            .with_country(
                "FI",
                Country {
                    name: "Finland".to_string(),
                    timezones: "Europe/Helsinki".to_string(),
                    price_source: json!("nordpool"),
                },
            )
            .with_timezone("Europe/Helsinki", "Helsinki (UTC+02:00)")
            .with_timezone("Europe/Stockholm", "Stockholm (UTC+01:00)"),
    )
}

#[tokio::test]
async fn test_fetch_static_in_order() {
    let api = backend();
    let sync = SyncClient::new(api.clone());

    let data = sync.fetch_static().await.expect("static fetch failed");

    assert_eq!(data.logics.len(), 1);
    assert_eq!(data.countries["FI"].name, "Finland");
    assert_eq!(data.timezones[1].0, "Europe/Stockholm");
    let paths: Vec<String> = api.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(paths, ["/logics/", "/countries/", "/timezones/"]);
}

#[tokio::test]
async fn test_fetch_graph_returns_nodes_by_name() {
    let api = backend();
    let (nodes, connections) = GraphBuilder::new()
        .node(1, "Zeta").build()
        .node(2, "Alpha").build()
        .connect(1, "out", 2, "in")
        .into_lists();
    api.seed(nodes, connections);
    let sync = SyncClient::new(api.clone());

    let (nodes, connections) = sync.fetch_graph().await.expect("graph fetch failed");

    let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "Zeta"]);
    assert_eq!(connections.len(), 1);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let api = backend();
    let sync = SyncClient::new(api.clone());

    sync.save_settings(&Settings::new("FI", "Europe/Helsinki")).await.expect("save failed");
    let settings = sync.fetch_settings().await.expect("read failed");

    assert_eq!(settings, Settings::new("FI", "Europe/Helsinki"));
    assert_eq!(api.variable("countrycode"), Some(json!("FI")));
    assert_eq!(api.variable("timezone"), Some(json!("Europe/Helsinki")));
}

#[tokio::test]
async fn test_unset_settings_read_as_none() {
    let sync = SyncClient::new(backend());

    let settings = sync.fetch_settings().await.expect("unset variables must not fail");

    assert_eq!(settings, Settings::default());
}

#[tokio::test]
async fn test_missing_variable_via_404_reads_as_none() {
    let api = backend();
    api.set_variable("timezone", json!("Europe/Helsinki"));
    api.fail_route("GET", "/variables/countrycode/", 404);
    let sync = SyncClient::new(api);

    let settings = sync.fetch_settings().await.expect("404 must read as unset");

    assert_eq!(settings.country_code, None);
    assert_eq!(settings.timezone.as_deref(), Some("Europe/Helsinki"));
}

#[tokio::test]
async fn test_other_variable_errors_abort_the_read() {
    let api = backend();
    api.fail_route("GET", "/variables/timezone/", 500);
    let sync = SyncClient::new(api);

    let result = sync.fetch_settings().await;

    assert!(matches!(result, Err(ApiError::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_existing_variable_is_updated_after_create_fails() {
    let api = backend();
    api.set_variable("countrycode", json!("SE"));
    let sync = SyncClient::new(api.clone());

    sync.save_settings(&Settings::new("FI", "Europe/Helsinki")).await.expect("save failed");

    assert_eq!(api.calls_to("POST", "/variables/").len(), 2);
    let patches = api.calls_to("PATCH", "/variables/countrycode/");
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].body, Some(json!({"value": "FI"})));
    assert!(api.calls_to("PATCH", "/variables/timezone/").is_empty());
    assert_eq!(api.variable("countrycode"), Some(json!("FI")));
}

#[tokio::test]
async fn test_only_set_values_are_saved() {
    let api = backend();
    let sync = SyncClient::new(api.clone());

    let partial = Settings { country_code: Some("FI".to_string()), timezone: None };
    sync.save_settings(&partial).await.expect("save failed");

    assert_eq!(api.variable("countrycode"), Some(json!("FI")));
    assert_eq!(api.variable("timezone"), None);
}

#[tokio::test]
async fn test_offline_backend_fails_with_transport_error() {
    let api = backend();
    api.set_offline(true);
    let sync = SyncClient::new(api);

    assert!(matches!(sync.fetch_graph().await, Err(ApiError::Transport(_))));
    assert!(matches!(sync.fetch_static().await, Err(ApiError::Transport(_))));
}
