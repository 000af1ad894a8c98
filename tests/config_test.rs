use nodecanvas::canvas::geometry::CurveStyle;
use nodecanvas::config::{load_config_from_yaml, EditorConfig};
use std::fs;
use std::time::Duration;

#[test]
fn test_load_full_config() {
    let yaml_content = r#"
base_url: "https://home.example.org/"
csrf_token: "abc123"
session_cookie: "sessionid=xyz"
poll_interval_secs: 10
request_timeout_secs: 3
canvas:
  width: 1280
  height: 720
  curve: fixed
"#;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("editor.yaml");
    fs::write(&file_path, yaml_content).expect("Failed to write temp file");

    let config = load_config_from_yaml(&file_path).expect("Failed to load config from YAML");

    assert_eq!(config.base_url, "https://home.example.org/");
    assert_eq!(config.csrf_token.as_deref(), Some("abc123"));
    assert_eq!(config.session_cookie.as_deref(), Some("sessionid=xyz"));
    assert_eq!(config.poll_interval(), Duration::from_secs(10));
    assert_eq!(config.request_timeout(), Duration::from_secs(3));
    assert_eq!(config.canvas.width, 1280.0);
    assert_eq!(config.canvas.curve, CurveStyle::Fixed);

    let api = config.build_api().expect("client should build");
    assert_eq!(api.url("/nodes/"), "https://home.example.org/api/v1/nodes/");
}

#[test]
fn test_missing_fields_take_defaults() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("partial.yaml");
    fs::write(&file_path, "base_url: \"http://10.0.0.2:8000\"\n").expect("Failed to write temp file");

    let config = load_config_from_yaml(&file_path).expect("Failed to load config from YAML");

    let defaults = EditorConfig::default();
    assert_eq!(config.base_url, "http://10.0.0.2:8000");
    assert_eq!(config.poll_interval(), Duration::from_secs(5));
    assert_eq!(config.canvas, defaults.canvas);
    assert_eq!(config.canvas.curve, CurveStyle::HalfDistance);
    assert!(config.csrf_token.is_none());
}

#[test]
fn test_zero_poll_interval_is_clamped() {
    let config = EditorConfig { poll_interval_secs: 0, ..EditorConfig::default() };
    assert_eq!(config.poll_interval(), Duration::from_secs(1));
}

#[test]
fn test_load_errors_name_the_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = temp_dir.path().join("missing.yaml");
    let err = load_config_from_yaml(&missing).expect_err("missing file should fail");
    assert!(err.to_string().contains("missing.yaml"));

    let broken = temp_dir.path().join("broken.yaml");
    fs::write(&broken, "canvas: [1, 2").expect("Failed to write temp file");
    let err = load_config_from_yaml(&broken).expect_err("broken YAML should fail");
    assert!(format!("{:#}", err).contains("broken.yaml"));
}
