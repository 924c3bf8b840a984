// ABOUTME: Configuration for the embedded engine and logging initialisation
// ABOUTME: Loads a YAML config file with environment overrides for secrets

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ai: AiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl EngineConfig {
    /// Load configuration from a YAML file, falling back to defaults when
    /// no file is given or it does not exist. Secrets can always be
    /// supplied through the environment instead of the file.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                serde_yaml::from_str(&contents)?
            }
            _ => Self::default(),
        };

        if let Ok(endpoint) = std::env::var("STAGEHAND_AI_ENDPOINT") {
            config.ai.endpoint = endpoint;
        }
        if let Ok(api_key) = std::env::var("STAGEHAND_AI_API_KEY") {
            config.ai.api_key = Some(api_key);
        }

        Ok(config)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            request_timeout_seconds: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Initialise the global tracing subscriber. Safe to call more than once;
/// later calls are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.format == "compact" {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber was already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();

        assert_eq!(config.ai.model, "gpt-4o");
        assert_eq!(config.ai.request_timeout_seconds, 60);
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load(Some(PathBuf::from("/nonexistent/stagehand.yaml"))).unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ai:\n  model: gpt-4o-mini\n  request_timeout_seconds: 15\nlogging:\n  level: debug\n"
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.ai.model, "gpt-4o-mini");
        assert_eq!(config.ai.request_timeout_seconds, 15);
        assert_eq!(config.logging.level, "debug");
        // Untouched sections keep their defaults.
        assert_eq!(config.ai.endpoint, AiConfig::default().endpoint);
    }
}
