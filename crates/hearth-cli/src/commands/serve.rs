//! `hearth serve`: mount the configured application behind the HTTP trigger.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use hearth_core::HearthConfig;
use hearth_gateway::{AppRegistry, Gateway};
use hearth_trigger::{HandlerOptions, HttpTrigger, gateway_handler};
use tokio::sync::watch;
use tracing::info;

pub fn serve(config_path: &Path, bind: Option<&str>) -> anyhow::Result<()> {
    let config = HearthConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let addr: SocketAddr = bind
        .unwrap_or(config.bind())
        .parse()
        .context("invalid bind address")?;

    let registry = AppRegistry::with_builtins();
    let gateway = Gateway::from_config(&config, &registry)?;
    info!(handler = gateway.handler(), %addr, "mounting application");

    let handler = gateway_handler(gateway, HandlerOptions::from_config(&config));
    let trigger = HttpTrigger::new(addr, handler);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut server = tokio::spawn(trigger.serve(shutdown_rx));

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to install CTRL+C handler")?;
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
                server.await?
            }
            // The server only stops on its own when accepting failed.
            result = &mut server => result?,
        }
    })?;

    info!("hearth stopped");
    Ok(())
}
