//! Hermes Runner Binary
//!
//! Usage: `hermes-runner [CONFIG_PATH]`
//!
//! Without a path the embedded default configuration is used.
//! Log output is controlled through `RUST_LOG` (default `info`).

use std::process::ExitCode;
use std::sync::Arc;

use hermes_gateway::ChannelSink;
use hermes_runner::{RunnerError, build_gateway, load_config, load_default_config, run_until};
use log::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RunnerError> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            load_config(path)?
        }
        None => load_default_config()?,
    };

    let (sink, mut inbound) = ChannelSink::pair();
    let gateway = build_gateway(&config, Arc::new(sink))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let received = run_until(&gateway, &config.topic_filters, &mut inbound, shutdown).await?;
    info!("Gateway stopped after {} messages", received);
    Ok(())
}
