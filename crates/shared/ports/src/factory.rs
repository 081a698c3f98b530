use std::sync::Arc;

use crate::client::{MqttClient, Publication};
use crate::config::ConnectOptions;
use crate::error::ClientResult;

/// Port for creating client instances and their defaults
///
/// Lets a gateway be built from configuration alone, with the factory
/// deciding how clients, connect options and publications look.
pub trait ClientFactory: Send + Sync {
    fn create_client(&self) -> ClientResult<Arc<dyn MqttClient>>;

    /// Options passed to `connect`; `None` means the client's defaults
    fn create_connect_options(&self) -> Option<ConnectOptions>;

    /// Template for outgoing publications
    fn create_publication(&self, payload: Vec<u8>) -> Publication {
        Publication::new(payload)
    }
}
