use thiserror::Error;

/// Errors reported by a broker client implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Client is already connected")]
    AlreadyConnected,

    #[error("Client is not connected")]
    NotConnected,

    #[error("Subscription failed: {0}")]
    Subscribe(String),

    #[error("Unsubscription failed: {0}")]
    Unsubscribe(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Disconnect failed: {0}")]
    Disconnect(String),

    #[error("Timeout waiting for broker")]
    Timeout,

    #[error("Invalid connect options: {0}")]
    Configuration(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Fatal gateway errors; everything else is logged and swallowed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection to MQTT broker failed: {0}")]
    Connection(#[source] ClientError),

    #[error("MQTT client creation failed: {0}")]
    ClientCreation(#[source] ClientError),
}
