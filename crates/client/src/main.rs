//! Autonomous agent binary.
//!
//! Composition root: loads configuration, installs logging, wires signal
//! handling to the runtime's cancellation token and runs the agent until it
//! is interrupted or hits a fatal error.
//!
//! ```bash
//! ARTIFACTS_TOKEN=... ARTIFACTS_CHARACTERS=ada,bob cargo run -p agent-client
//! ```
use anyhow::Result;
use tokio_util::sync::CancellationToken;

use client_bootstrap::{AgentBuilder, AgentConfig, setup_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    dotenvy::dotenv().ok();

    let config = AgentConfig::load()?;
    let _guard = setup_logging(&config.log_filter, config.log_dir.as_deref())?;

    tracing::info!(
        target: "client",
        characters = ?config.characters,
        "starting agent"
    );

    let cancel = CancellationToken::new();
    setup_shutdown_signal(cancel.clone());

    let runtime = AgentBuilder::new(config)
        .cancellation_token(cancel)
        .build()
        .await?;
    runtime.run().await?;

    tracing::info!(target: "client", "agent stopped");
    Ok(())
}

/// Cancels `cancel` on Ctrl+C or SIGTERM.
fn setup_shutdown_signal(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(target: "client", %error, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(error) => {
                    tracing::error!(target: "client", %error, "failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!(target: "client", "received Ctrl+C, shutting down"),
            _ = terminate => tracing::info!(target: "client", "received SIGTERM, shutting down"),
        }

        cancel.cancel();
    });
}
