//! Hermes Gateway
//!
//! Gateway layer for the Hermes MQTT bridge. Provides:
//! - The MQTT gateway adapter (broker <-> internal message bus)
//! - A `rumqttc`-backed broker client behind the `MqttClient` port
//! - A tokio channel sink for delivering inbound messages
//!
//! ## Architecture
//!
//! ```text
//! MQTT Broker
//!      │
//!  ┌───▼────────┐
//!  │ MqttClient │  rumqttc event loop task
//!  └───┬────────┘
//!      │ callbacks: message / connection lost / connect complete
//!  ┌───▼────────┐
//!  │ MqttGateway│  publish: "a/b/#" -> "a/b" retained
//!  └───┬────────┘
//!      │ MessageSink::deliver, incl. "$connected" = "1" | "0"
//!  ┌───▼────────┐
//!  │ Framework  │
//!  └────────────┘
//! ```

pub mod adapters;
pub mod logging;
pub mod transport;

// Re-export commonly used types
pub use adapters::MqttGateway;
pub use hermes_ports::{ClientError, GatewayError};
pub use logging::GatewayLog;
pub use transport::{ChannelSink, InboundReceiver, RumqttClient, RumqttFactory};
