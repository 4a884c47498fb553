//! Runtime settings.
//!
//! Values come from the built-in defaults, then an optional TOML file, then
//! `SPENDSCAN_*` environment variables (lists are comma separated).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub debounce_ms: u64,
    pub handler_schemes: Vec<String>,
    pub custom_tags: Vec<String>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debounce_ms: 20,
            handler_schemes: vec!["upi://".to_string()],
            custom_tags: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(
                Environment::with_prefix("SPENDSCAN")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("handler_schemes")
                    .with_list_parse_key("custom_tags"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
