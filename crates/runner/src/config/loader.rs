use std::path::Path;

use hermes_core::QoS;
use thiserror::Error;

use super::types::RunnerConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid publication QoS: {0}")]
    InvalidQoS(#[from] hermes_core::InvalidQoS),
    #[error("Topic filter at index {0} is empty")]
    EmptyTopicFilter(usize),
}

/// Load runner configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunnerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<RunnerConfig, ConfigError> {
    let config: RunnerConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<RunnerConfig, ConfigError> {
    let default_config = include_str!("runner_config.json");
    load_config_from_str(default_config)
}

impl RunnerConfig {
    pub fn publication_qos(&self) -> Result<QoS, ConfigError> {
        Ok(QoS::try_from(self.publication_qos)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.publication_qos()?;
        if let Some(idx) = self.topic_filters.iter().position(|f| f.is_empty()) {
            return Err(ConfigError::EmptyTopicFilter(idx));
        }
        Ok(())
    }
}
