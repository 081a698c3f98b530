use serde::{Deserialize, Serialize};

/// Largest packet the MQTT 3.1.1 remaining-length encoding can describe
pub const MAX_PACKET_SIZE: usize = 268_435_455;

/// Broker connection settings
///
/// The gateway never reads these; they are handed to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Broker URI, e.g. `tcp://localhost:1883`
    pub server_uri: String,
    /// Client identifier; generated when absent
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    pub connection_timeout_secs: u64,
    pub clean_session: bool,
    /// Let the client reconnect on its own after a lost connection
    pub automatic_reconnect: bool,
    pub reconnect_delay_ms: u64,
    pub max_inflight: u16,
    /// Capacity of the client's request queue
    pub channel_capacity: usize,
    /// Upper bound, in bytes, for packets sent and received
    pub max_packet_size: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            server_uri: "tcp://localhost:1883".to_string(),
            client_id: None,
            username: None,
            password: None,
            keep_alive_secs: 60,
            connection_timeout_secs: 30,
            clean_session: true,
            automatic_reconnect: false,
            reconnect_delay_ms: 1000,
            max_inflight: 10,
            channel_capacity: 100,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}
