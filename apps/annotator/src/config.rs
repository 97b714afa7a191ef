use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use client_core::HttpClientConfig;
use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE: &str = "annotator.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub auth_url: String,
    pub token_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api/".into(),
            auth_url: "http://localhost:8000/".into(),
            token_path: PathBuf::from("./data/token"),
            request_timeout_secs: 30,
        }
    }
}

/// Keys accepted in `annotator.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    auth_url: Option<String>,
    token_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the config file, then the environment. Later entries in
/// each env key list win.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.api_url {
                    settings.api_url = v;
                }
                if let Some(v) = file_cfg.auth_url {
                    settings.auth_url = v;
                }
                if let Some(v) = file_cfg.token_path {
                    settings.token_path = v;
                }
                if let Some(v) = file_cfg.request_timeout_secs {
                    settings.request_timeout_secs = v;
                }
            }
            Err(err) => warn!(path = %path.display(), %err, "ignoring unreadable config file"),
        }
    }

    for key in ["ANNOTATOR_API_URL", "APP__API_URL"] {
        if let Some(v) = env(key) {
            settings.api_url = v;
        }
    }
    for key in ["ANNOTATOR_AUTH_URL", "APP__AUTH_URL"] {
        if let Some(v) = env(key) {
            settings.auth_url = v;
        }
    }
    for key in ["ANNOTATOR_TOKEN_PATH", "APP__TOKEN_PATH"] {
        if let Some(v) = env(key) {
            settings.token_path = PathBuf::from(v);
        }
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "ignoring invalid APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    settings
}

impl Settings {
    pub fn client_config(&self) -> anyhow::Result<HttpClientConfig> {
        let config = HttpClientConfig::new(&self.api_url, &self.auth_url)
            .context("invalid backend url in settings")?;
        Ok(config.with_timeout(Duration::from_secs(self.request_timeout_secs)))
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
