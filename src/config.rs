use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use crate::api::http::HttpApi;
use crate::canvas::geometry::CurveStyle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub curve: CurveStyle,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
            curve: CurveStyle::default(),
        }
    }
}

/// Connection and display settings for an editor session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub base_url: String,
    pub csrf_token: Option<String>,
    pub session_cookie: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub canvas: CanvasConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            csrf_token: None,
            session_cookie: None,
            poll_interval_secs: 5,
            request_timeout_secs: 30,
            canvas: CanvasConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn build_api(&self) -> Result<HttpApi> {
        let mut api = HttpApi::new(&self.base_url, self.request_timeout())
            .with_context(|| format!("Failed to build HTTP client for {}", self.base_url))?;
        if let Some(token) = &self.csrf_token {
            api = api.with_csrf_token(token.clone());
        }
        if let Some(cookie) = &self.session_cookie {
            api = api.with_session_cookie(cookie.clone());
        }
        Ok(api)
    }
}

pub fn load_config_from_yaml(file_path: impl AsRef<Path>) -> Result<EditorConfig> {
    let file_path = file_path.as_ref();
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read YAML file from {}", file_path.display()))?;

    let config: EditorConfig = serde_yaml::from_str(&yaml_content)
        .with_context(|| format!("Failed to deserialize YAML content from {}", file_path.display()))?;

    Ok(config)
}
