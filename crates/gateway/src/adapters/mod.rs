//! Broker adapters
//!
//! Adapters translate between a broker client's callback API and the
//! internal message bus (Gateway In) and publish bus messages to the
//! broker (Gateway Out).

pub mod mqtt;

pub use mqtt::MqttGateway;
