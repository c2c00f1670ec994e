//! Assembles a [`Runtime`] from an [`AgentConfig`].
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use client_transport::HttpGameApi;
use runtime::{GameApi, Runtime};

use crate::config::AgentConfig;

/// Builder that wires the HTTP client and the runtime for the binary.
pub struct AgentBuilder {
    config: AgentConfig,
    api: Option<Arc<dyn GameApi>>,
    cancel: CancellationToken,
}

impl AgentBuilder {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            api: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the HTTP client, e.g. with `MockGameApi` for a dry run.
    pub fn api(mut self, api: Arc<dyn GameApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Token the caller cancels to stop the agent.
    pub fn cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn build(self) -> Result<Runtime> {
        let api = match self.api {
            Some(api) => api,
            None => {
                let http = HttpGameApi::new(self.config.http_config())
                    .context("failed to create HTTP client")?
                    .with_cancellation(self.cancel.child_token());
                tracing::info!(target: "client", url = %self.config.base_url, "using game server");
                Arc::new(http)
            }
        };

        Runtime::builder()
            .config(self.config.runtime_config())
            .api(api)
            .characters(self.config.characters.iter().cloned())
            .cancellation_token(self.cancel)
            .build()
            .await
            .context("failed to start agent runtime")
    }
}
