//! MQTT Gateway - bridges a broker client and the internal message bus
//!
//! Inbound: broker publications and connection changes are turned into bus
//! messages and handed to the framework's [`MessageSink`].
//! Outbound: bus messages are published to the broker, with a trailing `/#`
//! on the topic selecting a retained publication.

use std::sync::Arc;

use async_trait::async_trait;
use hermes_core::{Bundles, Message, PublishTarget, SUBSCRIPTION_QOS, is_valid_topic_name};
use hermes_ports::{
    ClientCallbacks, ClientError, ClientFactory, ConnectOptions, Gateway, GatewayError,
    MessageSink, MqttClient, Publication,
};
use log::Log;

use crate::logging::GatewayLog;

/// Gateway adapter for an MQTT broker
///
/// Holds no connection state of its own; the client's state is mirrored to
/// the bus through `$connected` messages.
pub struct MqttGateway {
    client: Arc<dyn MqttClient>,
    sink: Arc<dyn MessageSink>,
    connect_options: Option<ConnectOptions>,
    /// Source of publication templates when built from a factory
    factory: Option<Arc<dyn ClientFactory>>,
    log: GatewayLog,
}

impl std::fmt::Debug for MqttGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttGateway")
            .field("connect_options", &self.connect_options)
            .finish_non_exhaustive()
    }
}

impl MqttGateway {
    /// Create a gateway around an existing client
    ///
    /// `connect_options` of `None` connects with the client's defaults.
    pub fn new(
        client: Arc<dyn MqttClient>,
        connect_options: Option<ConnectOptions>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        let log = GatewayLog::default();
        client.set_callbacks(Arc::new(GatewayCallbacks {
            sink: sink.clone(),
            log: log.clone(),
        }));
        Self {
            client,
            sink,
            connect_options,
            factory: None,
            log,
        }
    }

    /// Create a gateway whose client, connect options and publications
    /// all come from `factory`
    pub fn from_factory(
        factory: Arc<dyn ClientFactory>,
        sink: Arc<dyn MessageSink>,
    ) -> Result<Self, GatewayError> {
        let client = factory
            .create_client()
            .map_err(GatewayError::ClientCreation)?;
        let mut gateway = Self::new(client, factory.create_connect_options(), sink);
        gateway.factory = Some(factory);
        Ok(gateway)
    }

    /// Route this gateway's log records to `sink`
    ///
    /// Call before `start`; the client picks up its callbacks on connect.
    pub fn with_logger(mut self, sink: Arc<dyn Log>) -> Self {
        self.log = GatewayLog::new(sink);
        self.client.set_callbacks(Arc::new(GatewayCallbacks {
            sink: self.sink.clone(),
            log: self.log.clone(),
        }));
        self
    }

    fn publication(&self, payload: &[u8]) -> Publication {
        match &self.factory {
            Some(factory) => factory.create_publication(payload.to_vec()),
            None => Publication::new(payload),
        }
    }
}

#[async_trait]
impl Gateway for MqttGateway {
    async fn start(&self, _bundles: &Bundles) -> Result<(), GatewayError> {
        self.log.info(format_args!("Connecting to MQTT broker."));
        match self.client.connect(self.connect_options.as_ref()).await {
            Ok(()) => {
                self.log.info(format_args!("Connected to MQTT broker."));
                Ok(())
            }
            Err(e) => {
                self.log
                    .error(format_args!("Connection to MQTT broker failed: {}", e));
                Err(GatewayError::Connection(e))
            }
        }
    }

    async fn stop(&self) {
        if let Err(e) = self.client.disconnect().await {
            self.log
                .error(format_args!("Disconnecting MQTT client failed: {}", e));
        }
        if let Err(e) = self.client.close().await {
            self.log
                .error(format_args!("Closing of MQTT client failed: {}", e));
        }
    }

    async fn add_topic_filter(&self, filter: &str) {
        self.log.info(format_args!("Subscribing to {}", filter));
        if let Err(e) = self.client.subscribe(filter, SUBSCRIPTION_QOS).await {
            self.log
                .error(format_args!("Subscribing to {} failed: {}", filter, e));
        }
    }

    async fn remove_topic_filter(&self, filter: &str) {
        self.log.info(format_args!("Unsubscribing from {}", filter));
        if let Err(e) = self.client.unsubscribe(filter).await {
            self.log
                .error(format_args!("Unsubscribing from {} failed: {}", filter, e));
        }
    }

    async fn publish(&self, message: &Message) {
        let target = PublishTarget::parse(message.topic());
        let publication = self
            .publication(message.payload())
            .with_retained(target.retained);

        if let Err(e) = self.client.publish(target.topic, publication).await {
            self.log.error(format_args!(
                "Publication of a MQTT message to {} failed: {}",
                target.topic, e
            ));
        }
    }

    fn save_state(&self, _out_bundles: &mut Bundles) {
        // Stateless across restarts
    }

    fn is_valid_topic_name(&self, topic: Option<&str>) -> bool {
        topic.is_some_and(is_valid_topic_name)
    }
}

/// Translates client events into bus messages
struct GatewayCallbacks {
    sink: Arc<dyn MessageSink>,
    log: GatewayLog,
}

impl ClientCallbacks for GatewayCallbacks {
    fn message_arrived(&self, topic: &str, payload: &[u8]) {
        self.sink.deliver(Message::new(topic, payload));
    }

    fn connection_lost(&self, cause: &ClientError) {
        self.log
            .warn(format_args!("Connection to MQTT broker lost: {}", cause));
        self.sink.deliver(Message::disconnected());
    }

    fn connect_complete(&self, _reconnect: bool, _server_uri: &str) {
        self.sink.deliver(Message::connected());
    }
}
