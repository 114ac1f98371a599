//! Search engine connection settings, read from the environment.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub url: String,
    pub content_index: String,
    pub dam_index: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9200".to_string(),
            content_index: "contents".to_string(),
            dam_index: "dam".to_string(),
            timeout: Duration::from_millis(10_000),
            max_retries: 1,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("ELASTIC_URL").unwrap_or(defaults.url),
            content_index: std::env::var("ELASTIC_CONTENT_INDEX").unwrap_or(defaults.content_index),
            dam_index: std::env::var("ELASTIC_DAM_INDEX").unwrap_or(defaults.dam_index),
            timeout: std::env::var("ELASTIC_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            max_retries: std::env::var("ELASTIC_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.max_retries),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}
