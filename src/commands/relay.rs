//! Run the signaling relay in the foreground

use crate::output::print_relay_banner;
use crate::signaling::{RelayConfig, RelayServer};
use anyhow::{Context, Result};

/// Serve until Ctrl-C
///
/// # Errors
///
/// Returns an error if the runtime cannot start or the address cannot be bound.
pub fn run_relay(config: RelayConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let bind_addr = config.bind_addr.clone();
        let server = RelayServer::bind(config)
            .await
            .with_context(|| format!("cannot listen on {bind_addr}"))?;
        print_relay_banner(server.local_addr()?);

        tokio::select! {
            () = server.run() => {}
            result = tokio::signal::ctrl_c() => {
                result?;
                log::info!("Relay stopped");
            }
        }
        Ok(())
    })
}
