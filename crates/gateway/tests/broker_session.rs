//! Integration test: RumqttClient <-> broker over a real socket
//!
//! A minimal MQTT 3.1.1 broker on a loopback listener answers CONNECT,
//! acks QoS 1 traffic and records every packet the client sends, so the
//! tests can check what actually reached the wire.

use std::sync::Arc;
use std::time::Duration;

use hermes_core::{Bundles, Message, QoS};
use hermes_gateway::{ChannelSink, MqttGateway, RumqttClient};
use hermes_ports::{
    ClientCallbacks, ClientError, ConnectOptions, Gateway, MqttClient, Publication,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const CONNECT: u8 = 1;
const PUBLISH: u8 = 3;
const SUBSCRIBE: u8 = 8;
const PINGREQ: u8 = 12;
const DISCONNECT: u8 = 14;

const WAIT: Duration = Duration::from_secs(5);

/// One control packet as seen on the wire
#[derive(Debug)]
struct RawPacket {
    header: u8,
    body: Vec<u8>,
}

impl RawPacket {
    fn kind(&self) -> u8 {
        self.header >> 4
    }

    fn qos(&self) -> u8 {
        (self.header >> 1) & 0x03
    }

    fn topic_len(&self) -> usize {
        u16::from_be_bytes([self.body[0], self.body[1]]) as usize
    }

    /// Topic of a PUBLISH packet
    fn topic(&self) -> String {
        String::from_utf8_lossy(&self.body[2..2 + self.topic_len()]).into_owned()
    }

    /// Payload length of a PUBLISH packet
    fn payload_len(&self) -> usize {
        let packet_id = if self.qos() > 0 { 2 } else { 0 };
        self.body.len() - 2 - self.topic_len() - packet_id
    }
}

async fn read_packet(stream: &mut TcpStream) -> Option<RawPacket> {
    let header = stream.read_u8().await.ok()?;
    let mut remaining = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await.ok()?;
        remaining |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0; remaining];
    stream.read_exact(&mut body).await.ok()?;
    Some(RawPacket { header, body })
}

fn encode(header: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![header];
    let mut len = body.len();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
    out.extend_from_slice(body);
    out
}

/// QoS 0 PUBLISH from broker to client
fn publish_packet(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = (topic.len() as u16).to_be_bytes().to_vec();
    body.extend_from_slice(topic.as_bytes());
    body.extend_from_slice(payload);
    encode(0x30, &body)
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let uri = format!("tcp://{}", listener.local_addr().unwrap());
    (listener, uri)
}

/// Accept one client and complete the CONNECT/CONNACK handshake
async fn accept_session(listener: &TcpListener) -> TcpStream {
    let (mut stream, _) = listener.accept().await.unwrap();
    let connect = read_packet(&mut stream).await.unwrap();
    assert_eq!(connect.kind(), CONNECT);
    stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();
    stream
}

/// Record packets until the client hangs up, acking what needs an ack
async fn serve_until_closed(mut stream: TcpStream) -> Vec<RawPacket> {
    let mut seen = Vec::new();
    while let Some(packet) = read_packet(&mut stream).await {
        let reply = match packet.kind() {
            PUBLISH if packet.qos() == 1 => {
                let at = 2 + packet.topic_len();
                Some(vec![0x40, 0x02, packet.body[at], packet.body[at + 1]])
            }
            SUBSCRIBE => Some(vec![0x90, 0x03, packet.body[0], packet.body[1], 0x01]),
            PINGREQ => Some(vec![0xd0, 0x00]),
            _ => None,
        };
        if let Some(reply) = reply {
            let _ = stream.write_all(&reply).await;
        }
        seen.push(packet);
    }
    seen
}

async fn broker_packets(broker: JoinHandle<Vec<RawPacket>>) -> Vec<RawPacket> {
    timeout(WAIT, broker)
        .await
        .expect("client hung up in time")
        .expect("broker task")
}

fn options(uri: &str) -> ConnectOptions {
    ConnectOptions {
        server_uri: uri.to_string(),
        connection_timeout_secs: 5,
        ..ConnectOptions::default()
    }
}

#[derive(Debug, PartialEq)]
enum Seen {
    Connected { reconnect: bool },
    Lost,
    Arrived(String, usize),
}

/// Callback sink forwarding every client event to the test
struct Recorder(mpsc::UnboundedSender<Seen>);

impl ClientCallbacks for Recorder {
    fn message_arrived(&self, topic: &str, payload: &[u8]) {
        let _ = self.0.send(Seen::Arrived(topic.to_string(), payload.len()));
    }

    fn connection_lost(&self, _cause: &ClientError) {
        let _ = self.0.send(Seen::Lost);
    }

    fn connect_complete(&self, reconnect: bool, _server_uri: &str) {
        let _ = self.0.send(Seen::Connected { reconnect });
    }
}

fn recorded_client(options: ConnectOptions) -> (RumqttClient, mpsc::UnboundedReceiver<Seen>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let client = RumqttClient::new(options);
    client.set_callbacks(Arc::new(Recorder(tx)));
    (client, rx)
}

async fn next_seen(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
    timeout(WAIT, rx.recv())
        .await
        .expect("client event in time")
        .expect("recorder alive")
}

#[tokio::test]
async fn test_session_events_and_clean_disconnect() {
    let _ = env_logger::try_init();

    let (listener, uri) = bind().await;
    let broker = tokio::spawn(async move {
        let mut stream = accept_session(&listener).await;
        stream
            .write_all(&publish_packet("plant/pump/state", b"running"))
            .await
            .unwrap();
        serve_until_closed(stream).await
    });

    let (client, mut events) = recorded_client(options(&uri));
    client.connect(None).await.expect("connect");

    assert_eq!(next_seen(&mut events).await, Seen::Connected { reconnect: false });
    assert_eq!(
        next_seen(&mut events).await,
        Seen::Arrived("plant/pump/state".to_string(), 7)
    );

    client.disconnect().await.expect("disconnect");
    client.close().await.expect("close");

    let packets = broker_packets(broker).await;
    assert_eq!(packets.last().map(RawPacket::kind), Some(DISCONNECT));
    // A local disconnect is not a lost connection
    assert!(events.try_recv().is_err());
    assert_eq!(client.disconnect().await, Err(ClientError::NotConnected));
}

#[tokio::test]
async fn test_gateway_stop_sends_disconnect() {
    let _ = env_logger::try_init();

    let (listener, uri) = bind().await;
    let broker = tokio::spawn(async move {
        let stream = accept_session(&listener).await;
        serve_until_closed(stream).await
    });

    let (sink, mut inbound) = ChannelSink::pair();
    let gateway = MqttGateway::new(
        Arc::new(RumqttClient::new(options(&uri))),
        None,
        Arc::new(sink),
    );

    gateway.start(&Bundles::new()).await.expect("start");
    assert_eq!(inbound.next().await.unwrap(), Message::connected());
    gateway.add_topic_filter("plant/+/state").await;
    gateway.stop().await;

    let kinds: Vec<u8> = broker_packets(broker)
        .await
        .iter()
        .map(RawPacket::kind)
        .collect();
    assert_eq!(kinds, vec![SUBSCRIBE, DISCONNECT]);
    assert!(inbound.try_next().is_none());
}

#[tokio::test]
async fn test_large_payloads_keep_connection() {
    let _ = env_logger::try_init();

    let large = vec![b'x'; 20 * 1024];
    let inbound_payload = large.clone();
    let (listener, uri) = bind().await;
    let broker = tokio::spawn(async move {
        let mut stream = accept_session(&listener).await;
        stream
            .write_all(&publish_packet("plant/blob", &inbound_payload))
            .await
            .unwrap();
        serve_until_closed(stream).await
    });

    let (sink, mut inbound) = ChannelSink::pair();
    let gateway = MqttGateway::new(
        Arc::new(RumqttClient::new(options(&uri))),
        None,
        Arc::new(sink),
    );

    gateway.start(&Bundles::new()).await.expect("start");
    assert_eq!(inbound.next().await.unwrap(), Message::connected());
    let received = inbound.next().await.unwrap();
    assert_eq!(received.topic(), "plant/blob");
    assert_eq!(received.payload().len(), large.len());

    gateway.publish(&Message::new("plant/upload", large.clone())).await;
    gateway.publish(&Message::new("plant/after", "ok")).await;
    gateway.stop().await;

    let published: Vec<(String, usize)> = broker_packets(broker)
        .await
        .iter()
        .filter(|p| p.kind() == PUBLISH)
        .map(|p| (p.topic(), p.payload_len()))
        .collect();
    assert_eq!(
        published,
        vec![
            ("plant/upload".to_string(), large.len()),
            ("plant/after".to_string(), 2),
        ]
    );
    assert!(inbound.try_next().is_none());
}

#[tokio::test]
async fn test_oversized_publish_rejected_before_sending() {
    let _ = env_logger::try_init();

    let (listener, uri) = bind().await;
    let broker = tokio::spawn(async move {
        let stream = accept_session(&listener).await;
        serve_until_closed(stream).await
    });

    let (client, mut events) = recorded_client(ConnectOptions {
        max_packet_size: 1024,
        ..options(&uri)
    });
    client.connect(None).await.expect("connect");
    assert_eq!(next_seen(&mut events).await, Seen::Connected { reconnect: false });

    let result = client
        .publish("plant/upload", Publication::new(vec![0u8; 4096]))
        .await;
    assert!(matches!(result, Err(ClientError::Publish(_))));

    client
        .publish("plant/after", Publication::new("ok"))
        .await
        .expect("connection still usable");
    client.disconnect().await.expect("disconnect");
    client.close().await.expect("close");

    let topics: Vec<String> = broker_packets(broker)
        .await
        .iter()
        .filter(|p| p.kind() == PUBLISH)
        .map(RawPacket::topic)
        .collect();
    assert_eq!(topics, vec!["plant/after".to_string()]);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_outage_fails_requests_fast_and_reconnects() {
    let _ = env_logger::try_init();

    let (listener, uri) = bind().await;
    let resume = Arc::new(Notify::new());
    let broker_resume = resume.clone();
    let broker = tokio::spawn(async move {
        // First session: drop the socket right after the handshake
        drop(accept_session(&listener).await);
        broker_resume.notified().await;
        let stream = accept_session(&listener).await;
        serve_until_closed(stream).await
    });

    let (client, mut events) = recorded_client(ConnectOptions {
        automatic_reconnect: true,
        reconnect_delay_ms: 50,
        channel_capacity: 2,
        ..options(&uri)
    });
    client.connect(None).await.expect("connect");
    assert_eq!(next_seen(&mut events).await, Seen::Connected { reconnect: false });
    assert_eq!(next_seen(&mut events).await, Seen::Lost);

    // More requests than the queue holds; none of them may wait for the broker
    for _ in 0..4 {
        let result = timeout(
            Duration::from_secs(1),
            client.publish("plant/pump/cmd", Publication::new("stop")),
        )
        .await
        .expect("publish returned while offline");
        assert_eq!(result, Err(ClientError::NotConnected));
    }
    let result = timeout(
        Duration::from_secs(1),
        client.subscribe("plant/#", QoS::AtLeastOnce),
    )
    .await
    .expect("subscribe returned while offline");
    assert_eq!(result, Err(ClientError::NotConnected));

    resume.notify_one();
    assert_eq!(next_seen(&mut events).await, Seen::Connected { reconnect: true });

    client
        .publish("plant/pump/cmd", Publication::new("start"))
        .await
        .expect("publish after reconnect");
    client.disconnect().await.expect("disconnect");
    client.close().await.expect("close");

    let packets = broker_packets(broker).await;
    let kinds: Vec<u8> = packets.iter().map(RawPacket::kind).collect();
    assert_eq!(kinds, vec![PUBLISH, DISCONNECT]);
    // Exactly one outage was reported
    assert!(events.try_recv().is_err());
}
