use async_trait::async_trait;
use hermes_core::{Bundles, Message};

use crate::error::GatewayError;

/// Lifecycle contract a framework drives a gateway through
///
/// Only `start` can fail; every other failure is the gateway's to log.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Open the broker connection, waiting for the attempt to complete
    async fn start(&self, bundles: &Bundles) -> Result<(), GatewayError>;

    async fn stop(&self);

    async fn add_topic_filter(&self, filter: &str);

    async fn remove_topic_filter(&self, filter: &str);

    async fn publish(&self, message: &Message);

    fn save_state(&self, out_bundles: &mut Bundles);

    /// Whether `topic` may be used as a publication target
    fn is_valid_topic_name(&self, topic: Option<&str>) -> bool;
}
