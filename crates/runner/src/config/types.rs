use hermes_ports::ConnectOptions;
use serde::{Deserialize, Serialize};

/// Runner configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Passed to the broker client untouched
    #[serde(default)]
    pub connect: ConnectOptions,
    /// Filters subscribed right after start
    #[serde(default)]
    pub topic_filters: Vec<String>,
    /// QoS level (0-2) for outgoing publications
    #[serde(default = "default_publication_qos")]
    pub publication_qos: u8,
}

fn default_publication_qos() -> u8 {
    1
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            connect: ConnectOptions::default(),
            topic_filters: Vec::new(),
            publication_qos: default_publication_qos(),
        }
    }
}
