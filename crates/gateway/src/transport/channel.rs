//! Tokio channel-based message sink for single-process mode
//!
//! Uses an unbounded mpsc channel so that delivery from the broker client's
//! event task never waits on the consumer.

use hermes_core::Message;
use hermes_ports::MessageSink;
use log::warn;
use tokio::sync::mpsc;

/// Channel-based sink handed to the gateway
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelSink {
    /// Create a sink/receiver pair
    pub fn pair() -> (Self, InboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, InboundReceiver { rx })
    }
}

impl MessageSink for ChannelSink {
    fn deliver(&self, message: Message) {
        if let Err(mpsc::error::SendError(message)) = self.tx.send(message) {
            warn!(
                "Dropping message on {}: inbound receiver closed",
                message.topic()
            );
        }
    }
}

/// Receiving end of a [`ChannelSink`]
#[derive(Debug)]
pub struct InboundReceiver {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl InboundReceiver {
    /// Wait for the next message; `None` once every sink is dropped
    pub async fn next(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Try to receive without blocking (returns None if no message available)
    pub fn try_next(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}
