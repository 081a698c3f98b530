//! Hermes Ports
//!
//! Port definitions (traits) for the Hermes MQTT gateway.
//! These define the boundaries between the gateway adapter, the broker
//! client library behind it, and the framework in front of it.

mod client;
mod config;
mod error;
mod factory;
mod gateway;
mod sink;

pub use client::{ClientCallbacks, MqttClient, Publication};
pub use config::{ConnectOptions, MAX_PACKET_SIZE};
pub use error::{ClientError, ClientResult, GatewayError};
pub use factory::ClientFactory;
pub use gateway::Gateway;
pub use sink::MessageSink;
