//! rumqttc-backed broker client
//!
//! Drives a `rumqttc` event loop on its own tokio task and reports what it
//! sees through the registered [`ClientCallbacks`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use hermes_core::QoS;
use hermes_ports::{
    ClientCallbacks, ClientError, ClientFactory, ClientResult, ConnectOptions, MqttClient,
    Publication,
};
use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use url::{Host, Url};
use uuid::Uuid;

/// Port used when the server URI does not name one
pub const DEFAULT_PORT: u16 = 1883;

/// How long `disconnect` waits for the event loop to flush DISCONNECT
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// MQTT client backed by `rumqttc`
///
/// Callbacks are captured when `connect` spawns the event loop, so a sink
/// registered later only sees events from the next connection.
///
/// Requests never wait on the event loop: while the broker is unreachable
/// they fail with [`ClientError::NotConnected`], and a full request queue
/// fails the request instead of blocking the caller.
pub struct RumqttClient {
    default_options: ConnectOptions,
    callbacks: RwLock<Arc<dyn ClientCallbacks>>,
    session: Mutex<Option<Session>>,
}

/// A live connection: the request handle plus the task polling the event loop
struct Session {
    client: AsyncClient,
    /// Set by the driver between ConnAck and the next connection error
    online: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    max_packet_size: usize,
    event_loop: JoinHandle<()>,
}

impl Session {
    fn online(session: &Option<Session>) -> ClientResult<&Session> {
        session
            .as_ref()
            .filter(|s| s.online.load(Ordering::SeqCst))
            .ok_or(ClientError::NotConnected)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.event_loop.is_finished() {
            self.event_loop.abort();
        }
    }
}

impl RumqttClient {
    /// Create a client; `default_options` are used by `connect(None)`
    pub fn new(default_options: ConnectOptions) -> Self {
        let callbacks: Arc<dyn ClientCallbacks> = Arc::new(NoCallbacks);
        Self {
            default_options,
            callbacks: RwLock::new(callbacks),
            session: Mutex::new(None),
        }
    }

    fn callbacks(&self) -> Arc<dyn ClientCallbacks> {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MqttClient for RumqttClient {
    fn set_callbacks(&self, callbacks: Arc<dyn ClientCallbacks>) {
        *self
            .callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner) = callbacks;
    }

    async fn connect(&self, options: Option<&ConnectOptions>) -> ClientResult<()> {
        let options = options.unwrap_or(&self.default_options);
        let mut session = self.session.lock().await;
        if session
            .as_ref()
            .is_some_and(|s| !s.event_loop.is_finished())
        {
            return Err(ClientError::AlreadyConnected);
        }

        let mqtt_options = mqtt_options(options)?;
        debug!(
            "Connecting to {} as {}",
            options.server_uri,
            mqtt_options.client_id()
        );

        let (client, event_loop) = AsyncClient::new(mqtt_options, options.channel_capacity.max(1));
        let online = Arc::new(AtomicBool::new(false));
        let closing = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel();

        let driver = EventDriver {
            callbacks: self.callbacks(),
            server_uri: options.server_uri.clone(),
            online: online.clone(),
            closing: closing.clone(),
            automatic_reconnect: options.automatic_reconnect,
            reconnect_delay: Duration::from_millis(options.reconnect_delay_ms),
        };
        let pending = Session {
            client,
            online,
            closing,
            max_packet_size: options.max_packet_size,
            event_loop: tokio::spawn(driver.run(event_loop, ready_tx)),
        };

        // A timeout of zero waits for as long as the attempt takes
        let outcome = match options.connection_timeout_secs {
            0 => Ok(ready_rx.await),
            secs => tokio::time::timeout(Duration::from_secs(secs), ready_rx).await,
        };

        match outcome {
            Ok(Ok(Ok(()))) => {
                *session = Some(pending);
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(ClientError::Connection(
                "event loop stopped before the connection completed".to_string(),
            )),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    async fn disconnect(&self) -> ClientResult<()> {
        let mut session = self.session.lock().await;
        let session = session
            .as_mut()
            .filter(|s| !s.event_loop.is_finished())
            .ok_or(ClientError::NotConnected)?;

        session.closing.store(true, Ordering::SeqCst);
        session
            .client
            .try_disconnect()
            .map_err(|e| ClientError::Disconnect(e.to_string()))?;

        // The driver returns once DISCONNECT has been written to the socket
        match tokio::time::timeout(DISCONNECT_TIMEOUT, &mut session.event_loop).await {
            Ok(_) => Ok(()),
            Err(_) => Err(ClientError::Disconnect(
                "timed out waiting for DISCONNECT to be sent".to_string(),
            )),
        }
    }

    async fn close(&self) -> ClientResult<()> {
        if self.session.lock().await.take().is_some() {
            debug!("MQTT client closed");
        }
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> ClientResult<()> {
        let session = self.session.lock().await;
        let session = Session::online(&session)?;
        session
            .client
            .try_subscribe(filter, to_rumqtt(qos))
            .map_err(|e| ClientError::Subscribe(format!("{}: {}", filter, e)))
    }

    async fn unsubscribe(&self, filter: &str) -> ClientResult<()> {
        let session = self.session.lock().await;
        let session = Session::online(&session)?;
        session
            .client
            .try_unsubscribe(filter)
            .map_err(|e| ClientError::Unsubscribe(format!("{}: {}", filter, e)))
    }

    async fn publish(&self, topic: &str, publication: Publication) -> ClientResult<()> {
        let session = self.session.lock().await;
        let session = Session::online(&session)?;

        // Oversized packets would fail inside the event loop and drop the connection
        let size = publish_packet_size(topic, &publication);
        if size > session.max_packet_size {
            return Err(ClientError::Publish(format!(
                "packet of {} bytes exceeds the {} byte limit",
                size, session.max_packet_size
            )));
        }

        session
            .client
            .try_publish(
                topic,
                to_rumqtt(publication.qos),
                publication.retained,
                publication.payload,
            )
            .map_err(|e| ClientError::Publish(format!("{}: {}", topic, e)))
    }
}

/// Polls the event loop and turns events into callbacks
struct EventDriver {
    callbacks: Arc<dyn ClientCallbacks>,
    server_uri: String,
    online: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    automatic_reconnect: bool,
    reconnect_delay: Duration,
}

impl EventDriver {
    async fn run(self, mut event_loop: EventLoop, ready: oneshot::Sender<ClientResult<()>>) {
        let mut ready = Some(ready);
        let mut has_connected = false;

        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    let reconnect = has_connected;
                    has_connected = true;
                    self.online.store(true, Ordering::SeqCst);
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    }
                    if reconnect {
                        info!("Reconnected to {}", self.server_uri);
                    }
                    self.callbacks.connect_complete(reconnect, &self.server_uri);
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.callbacks
                        .message_arrived(&publish.topic, &publish.payload);
                }
                Ok(Event::Incoming(Packet::PubAck(ack))) => {
                    self.callbacks.delivery_complete(ack.pkid);
                }
                Ok(Event::Incoming(Packet::PubComp(comp))) => {
                    self.callbacks.delivery_complete(comp.pkid);
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    self.online.store(false, Ordering::SeqCst);
                    debug!("Disconnected from {}", self.server_uri);
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    let was_online = self.online.swap(false, Ordering::SeqCst);
                    let cause = ClientError::Connection(e.to_string());
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(cause));
                        return;
                    }
                    if self.closing.load(Ordering::SeqCst) {
                        return;
                    }
                    if was_online {
                        warn!("Connection to {} lost: {}", self.server_uri, e);
                        self.callbacks.connection_lost(&cause);
                    }
                    if !self.automatic_reconnect {
                        return;
                    }
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}

/// Callback sink used until one is registered
struct NoCallbacks;

impl ClientCallbacks for NoCallbacks {
    fn message_arrived(&self, _topic: &str, _payload: &[u8]) {}

    fn connection_lost(&self, _cause: &ClientError) {}

    fn connect_complete(&self, _reconnect: bool, _server_uri: &str) {}
}

/// Map connect options onto rumqttc options
fn mqtt_options(options: &ConnectOptions) -> ClientResult<MqttOptions> {
    let (host, port) = broker_address(&options.server_uri)?;

    let client_id = match &options.client_id {
        Some(id) if id.is_empty() => {
            return Err(ClientError::Configuration(
                "client_id must not be empty".to_string(),
            ));
        }
        Some(id) => id.clone(),
        None => format!("hermes-{}", Uuid::new_v4().simple()),
    };

    if options.max_inflight == 0 {
        return Err(ClientError::Configuration(
            "max_inflight must be at least 1".to_string(),
        ));
    }

    if options.max_packet_size == 0 {
        return Err(ClientError::Configuration(
            "max_packet_size must be at least 1".to_string(),
        ));
    }

    let mut mqtt_options = MqttOptions::new(client_id, host, port);
    mqtt_options
        .set_keep_alive(Duration::from_secs(options.keep_alive_secs))
        .set_clean_session(options.clean_session)
        .set_inflight(options.max_inflight)
        .set_max_packet_size(options.max_packet_size, options.max_packet_size);

    match (&options.username, &options.password) {
        (Some(username), password) => {
            mqtt_options.set_credentials(username, password.clone().unwrap_or_default());
        }
        (None, Some(_)) => {
            return Err(ClientError::Configuration(
                "password given without a username".to_string(),
            ));
        }
        (None, None) => {}
    }

    Ok(mqtt_options)
}

/// Host and port from a `tcp://` or `mqtt://` URI
fn broker_address(server_uri: &str) -> ClientResult<(String, u16)> {
    let url = Url::parse(server_uri)
        .map_err(|e| ClientError::Configuration(format!("{}: {}", server_uri, e)))?;

    match url.scheme() {
        "tcp" | "mqtt" => {}
        other => {
            return Err(ClientError::Configuration(format!(
                "unsupported scheme '{}' in {}",
                other, server_uri
            )));
        }
    }

    // IPv6 literals must reach the resolver without their brackets
    let host = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => {
            return Err(ClientError::Configuration(format!(
                "missing host in {}",
                server_uri
            )));
        }
    };

    Ok((host, url.port().unwrap_or(DEFAULT_PORT)))
}

/// Encoded size of a PUBLISH packet: fixed header plus remaining length
fn publish_packet_size(topic: &str, publication: &Publication) -> usize {
    let packet_id = match publication.qos {
        QoS::AtMostOnce => 0,
        QoS::AtLeastOnce | QoS::ExactlyOnce => 2,
    };
    let remaining = 2 + topic.len() + packet_id + publication.payload.len();
    let length_bytes = match remaining {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    };
    1 + length_bytes + remaining
}

fn to_rumqtt(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

/// Factory producing [`RumqttClient`]s from one set of connect options
#[derive(Debug, Clone)]
pub struct RumqttFactory {
    options: ConnectOptions,
    publication_qos: QoS,
}

impl RumqttFactory {
    pub fn new(options: ConnectOptions) -> Self {
        Self {
            options,
            publication_qos: QoS::default(),
        }
    }

    /// QoS stamped on every publication built by this factory
    pub fn with_publication_qos(mut self, qos: QoS) -> Self {
        self.publication_qos = qos;
        self
    }
}

impl ClientFactory for RumqttFactory {
    fn create_client(&self) -> ClientResult<Arc<dyn MqttClient>> {
        // Reject bad options here rather than on the first connect
        broker_address(&self.options.server_uri)?;
        Ok(Arc::new(RumqttClient::new(self.options.clone())))
    }

    fn create_connect_options(&self) -> Option<ConnectOptions> {
        Some(self.options.clone())
    }

    fn create_publication(&self, payload: Vec<u8>) -> Publication {
        Publication::new(payload).with_qos(self.publication_qos)
    }
}
