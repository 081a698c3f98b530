use serde::{Deserialize, Serialize};

/// Reserved topic carrying broker connectivity status
pub const CONNECTED_TOPIC: &str = "$connected";

/// Payload published on [`CONNECTED_TOPIC`] when the broker connection is up
pub const CONNECTED_PAYLOAD: &str = "1";

/// Payload published on [`CONNECTED_TOPIC`] when the broker connection is lost
pub const DISCONNECTED_PAYLOAD: &str = "0";

/// A bus message: a topic and an opaque payload
///
/// Messages are created on every inbound/outbound translation and carry no
/// identity beyond their fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    topic: String,
    payload: Vec<u8>,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Connectivity message with payload "1"
    pub fn connected() -> Self {
        Self::connectivity(true)
    }

    /// Connectivity message with payload "0"
    pub fn disconnected() -> Self {
        Self::connectivity(false)
    }

    pub fn connectivity(connected: bool) -> Self {
        let payload = if connected {
            CONNECTED_PAYLOAD
        } else {
            DISCONNECTED_PAYLOAD
        };
        Self::new(CONNECTED_TOPIC, payload)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text, if it is valid UTF-8
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Returns true for messages on the reserved connectivity topic
    pub fn is_connectivity(&self) -> bool {
        self.topic == CONNECTED_TOPIC
    }
}
