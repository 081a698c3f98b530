//! Hermes Runner - standalone MQTT gateway process
//!
//! Wires the gateway together from a JSON configuration:
//!
//! - **Config**: broker connect options, topic filters, publication QoS
//! - **Gateway**: `rumqttc`-backed [`MqttGateway`] built through a factory
//! - **Run loop**: subscribes the configured filters and logs inbound
//!   traffic until shutdown is requested

pub mod config;

pub use config::{ConfigError, RunnerConfig, load_config, load_config_from_str, load_default_config};

use std::future::Future;
use std::sync::Arc;

use hermes_core::{Bundles, CONNECTED_PAYLOAD};
use hermes_gateway::{InboundReceiver, MqttGateway, RumqttFactory};
use hermes_ports::{Gateway, GatewayError, MessageSink};
use log::{debug, info};
use thiserror::Error;

/// Runner-level errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Build a `rumqttc`-backed gateway delivering into `sink`
pub fn build_gateway(
    config: &RunnerConfig,
    sink: Arc<dyn MessageSink>,
) -> Result<MqttGateway, RunnerError> {
    let factory = RumqttFactory::new(config.connect.clone())
        .with_publication_qos(config.publication_qos()?);
    Ok(MqttGateway::from_factory(Arc::new(factory), sink)?)
}

/// Start `gateway`, subscribe `topic_filters` and log inbound traffic
/// until `shutdown` resolves, then stop the gateway.
///
/// Returns the number of broker messages received (connectivity messages
/// are not counted).
pub async fn run_until<G, F>(
    gateway: &G,
    topic_filters: &[String],
    inbound: &mut InboundReceiver,
    shutdown: F,
) -> Result<u64, GatewayError>
where
    G: Gateway + ?Sized,
    F: Future<Output = ()>,
{
    gateway.start(&Bundles::new()).await?;
    for filter in topic_filters {
        gateway.add_topic_filter(filter).await;
    }

    tokio::pin!(shutdown);
    let mut received = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            message = inbound.next() => {
                match message {
                    Some(message) if message.is_connectivity() => {
                        let up = message.payload() == CONNECTED_PAYLOAD.as_bytes();
                        info!("Broker connection {}", if up { "up" } else { "down" });
                    }
                    Some(message) => {
                        received += 1;
                        debug!(
                            "{} <- {}",
                            message.topic(),
                            String::from_utf8_lossy(message.payload())
                        );
                    }
                    None => break,
                }
            }
        }
    }

    gateway.stop().await;
    Ok(received)
}
