//! Hermes Core Domain
//!
//! Pure domain types for the Hermes MQTT gateway.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod bundle;
pub mod message;
pub mod qos;
pub mod topic;

// Re-export commonly used types at crate root
pub use bundle::{Bundle, Bundles};
pub use message::{CONNECTED_PAYLOAD, CONNECTED_TOPIC, DISCONNECTED_PAYLOAD, Message};
pub use qos::{InvalidQoS, QoS, SUBSCRIPTION_QOS};
pub use topic::{PublishTarget, RETAINED_SUFFIX, is_valid_topic_name};
