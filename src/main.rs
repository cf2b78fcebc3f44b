#![warn(clippy::shadow_reuse, clippy::shadow_same, clippy::builtin_type_shadow)]
mod config;
mod console_communication;
mod flight_control;
mod logger;

use crate::config::GcsConfig;
use crate::console_communication::{ConsoleMessenger, RelayEndpoint};
use crate::flight_control::Supervisor;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let config = GcsConfig::from_env().unwrap_or_else(|e| fatal!("Invalid configuration: {e}"));
    let c_tok = CancellationToken::new();

    let relay = RelayEndpoint::start(config.relay_addr())
        .await
        .unwrap_or_else(|e| fatal!("Relay failed to bind {}: {e}", config.relay_addr()));

    let (supervisor, handle) = Supervisor::new(*config.sim(), config.stable_link());
    let sim_task = tokio::spawn(supervisor.run(c_tok.clone()));

    let messenger = ConsoleMessenger::start(config.console_addr(), handle, c_tok.clone())
        .await
        .unwrap_or_else(|e| fatal!("Console endpoint failed to bind {}: {e}", config.console_addr()));
    info!(
        "Ground control up. Relay on {}, consoles on {}.",
        relay.local_addr(),
        messenger.local_addr()
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down, closing relay with {} peers attached.", relay.peer_count());
    c_tok.cancel();
    if let Err(e) = sim_task.await {
        error!("Simulation task ended abnormally: {e}");
    }
    drop(messenger);
    drop(relay);
}
