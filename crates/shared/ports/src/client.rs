use std::sync::Arc;

use async_trait::async_trait;
use hermes_core::QoS;

use crate::config::ConnectOptions;
use crate::error::{ClientError, ClientResult};

/// Outgoing broker publication (the topic travels separately)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retained: bool,
}

impl Publication {
    /// Non-retained publication at the default QoS
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            qos: QoS::default(),
            retained: false,
        }
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_retained(mut self, retained: bool) -> Self {
        self.retained = retained;
        self
    }
}

/// Events raised by a broker client
///
/// Invoked on the client's own event task, so implementations must not block.
pub trait ClientCallbacks: Send + Sync {
    /// A publication arrived on a subscribed topic
    fn message_arrived(&self, topic: &str, payload: &[u8]);

    /// An established connection was lost
    fn connection_lost(&self, cause: &ClientError);

    /// A connection (initial or automatic reconnect) was established
    fn connect_complete(&self, reconnect: bool, server_uri: &str);

    /// A QoS > 0 publication was acknowledged by the broker
    fn delivery_complete(&self, packet_id: u16) {
        let _ = packet_id;
    }
}

/// Port for an asynchronous MQTT client
///
/// Anything that can connect to a broker and report events through
/// [`ClientCallbacks`] can sit behind the gateway.
#[async_trait]
pub trait MqttClient: Send + Sync {
    /// Register the sink for client events, replacing any previous one
    fn set_callbacks(&self, callbacks: Arc<dyn ClientCallbacks>);

    /// Connect and wait until the attempt completes
    ///
    /// `None` uses the client's own defaults.
    async fn connect(&self, options: Option<&ConnectOptions>) -> ClientResult<()>;

    /// Disconnect gracefully from the broker
    async fn disconnect(&self) -> ClientResult<()>;

    /// Release client resources
    async fn close(&self) -> ClientResult<()>;

    async fn subscribe(&self, filter: &str, qos: QoS) -> ClientResult<()>;

    async fn unsubscribe(&self, filter: &str) -> ClientResult<()>;

    async fn publish(&self, topic: &str, publication: Publication) -> ClientResult<()>;
}
