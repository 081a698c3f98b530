//! Transport layer
//!
//! Concrete implementations of the client and sink ports:
//! - `channel`: tokio channel-backed [`MessageSink`](hermes_ports::MessageSink)
//! - `rumqtt`: `rumqttc`-backed [`MqttClient`](hermes_ports::MqttClient)

pub mod channel;
pub mod rumqtt;

pub use channel::{ChannelSink, InboundReceiver};
pub use rumqtt::{RumqttClient, RumqttFactory};
