use hermes_core::Message;

/// Port for the framework's inbound dispatch path
///
/// Called from the broker client's event task for every received message
/// and every synthesized connectivity message. Must not block.
pub trait MessageSink: Send + Sync {
    fn deliver(&self, message: Message);
}
