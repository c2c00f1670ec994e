//! High-level runtime orchestrator.
//!
//! The runtime loads the world, spawns one actor per character, the decision
//! engine loop and the world refresher, then supervises them: the first fatal
//! error (or an external cancellation) cancels every task and ends the run.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::{CharacterHandle, GameApi, Result, RuntimeError};
use crate::engine::{DecisionConfig, DecisionEngine, EngineError};
use crate::workers::{CharacterActor, EngineWorker};
use crate::world::{WorldError, WorldIndex, WorldRefresher};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Commands queued per character. The engine sends one per report, so
    /// this rarely needs to grow.
    pub command_buffer_size: usize,
    pub report_buffer_size: usize,
    pub bank_buffer_size: usize,
    pub map_refresh_interval: Duration,
    /// Catalog refresh period; `None` loads catalogs once at start-up.
    pub catalog_refresh_interval: Option<Duration>,
    pub decision: DecisionConfig,
    /// Seed for the fallback policy; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 4,
            report_buffer_size: 64,
            bank_buffer_size: 64,
            map_refresh_interval: Duration::from_secs(2),
            catalog_refresh_interval: None,
            decision: DecisionConfig::default(),
            rng_seed: None,
        }
    }
}

/// Running agent.
///
/// Design: Runtime owns every worker task; [`CharacterHandle`]s and the
/// [`WorldIndex`] are cloneable views for observers.
pub struct Runtime {
    world: WorldIndex,
    characters: Vec<CharacterHandle>,
    cancel: CancellationToken,

    // Background workers
    engine_task: JoinHandle<std::result::Result<(), EngineError>>,
    world_task: JoinHandle<()>,
    actor_tasks: Vec<JoinHandle<()>>,
    world_error_rx: mpsc::Receiver<WorldError>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn world(&self) -> WorldIndex {
        self.world.clone()
    }

    pub fn characters(&self) -> &[CharacterHandle] {
        &self.characters
    }

    /// Token that stops the whole runtime when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Supervises the workers until cancellation or the first fatal error.
    ///
    /// Every task is cancelled and joined before returning. The result is
    /// `Ok(())` only for an externally requested shutdown.
    pub async fn run(self) -> Result<()> {
        let Runtime {
            cancel,
            mut engine_task,
            world_task,
            actor_tasks,
            mut world_error_rx,
            ..
        } = self;

        let mut engine_finished = false;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                info!(target: "runtime", "shutdown requested");
                Ok(())
            }
            joined = &mut engine_task => {
                engine_finished = true;
                match joined {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(error)) => Err(RuntimeError::Engine(error)),
                    Err(join) => Err(RuntimeError::WorkerJoin(join)),
                }
            }
            Some(error) = world_error_rx.recv() => Err(RuntimeError::World(error)),
        };

        if let Err(error) = &outcome {
            error!(target: "runtime", error = %error, "fatal error, stopping agent");
        }
        cancel.cancel();

        let mut joined = Ok(());
        if !engine_finished {
            if let Err(join) = engine_task.await {
                joined = Err(RuntimeError::WorkerJoin(join));
            }
        }
        for task in actor_tasks.into_iter().chain(std::iter::once(world_task)) {
            if let Err(join) = task.await {
                if joined.is_ok() {
                    joined = Err(RuntimeError::WorkerJoin(join));
                }
            }
        }

        info!(target: "runtime", "runtime stopped");
        outcome.and(joined)
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    api: Option<Arc<dyn GameApi>>,
    characters: Vec<String>,
    cancel: Option<CancellationToken>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            api: None,
            characters: Vec::new(),
            cancel: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the game server client (required)
    pub fn api(mut self, api: Arc<dyn GameApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn character(mut self, name: impl Into<String>) -> Self {
        self.characters.push(name.into());
        self
    }

    pub fn characters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.characters.extend(names.into_iter().map(Into::into));
        self
    }

    /// Share a cancellation token with the caller (e.g. a signal handler).
    pub fn cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Loads the world and spawns every worker.
    ///
    /// A failed initial world load is fatal: nothing is spawned.
    pub async fn build(self) -> Result<Runtime> {
        let api = self.api.ok_or(RuntimeError::MissingApi)?;
        if self.characters.is_empty() {
            return Err(RuntimeError::EmptyRoster);
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.characters.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(RuntimeError::DuplicateCharacter(duplicate.clone()));
        }

        let config = self.config;
        let cancel = self.cancel.unwrap_or_default();

        let world = WorldIndex::new();
        world.load_all(api.as_ref()).await?;

        let (report_tx, report_rx) = mpsc::channel(config.report_buffer_size.max(1));
        let (bank_tx, bank_rx) = mpsc::channel(config.bank_buffer_size.max(1));
        let (world_error_tx, world_error_rx) = mpsc::channel(1);

        let mut characters = Vec::with_capacity(self.characters.len());
        let mut actor_tasks = Vec::with_capacity(self.characters.len());
        for name in self.characters {
            let (actor, handle) = CharacterActor::new(
                name,
                Arc::clone(&api),
                report_tx.clone(),
                bank_tx.clone(),
                cancel.child_token(),
                config.command_buffer_size,
            );
            actor_tasks.push(tokio::spawn(actor.run()));
            characters.push(handle);
        }
        // Actors hold the only senders from here on.
        drop(report_tx);
        drop(bank_tx);

        let engine = match config.rng_seed {
            Some(seed) => DecisionEngine::with_seed(world.clone(), config.decision.clone(), seed),
            None => DecisionEngine::new(world.clone(), config.decision.clone()),
        };
        let engine_worker =
            EngineWorker::new(engine, characters.clone(), report_rx, cancel.child_token());
        let engine_task = tokio::spawn(engine_worker.run());

        let refresher = WorldRefresher::new(
            api,
            world.clone(),
            bank_rx,
            world_error_tx,
            cancel.child_token(),
        )
        .with_map_interval(config.map_refresh_interval)
        .with_catalog_interval(config.catalog_refresh_interval);
        let world_task = tokio::spawn(refresher.run());

        info!(
            target: "runtime",
            characters = characters.len(),
            tiles = world.tile_count(),
            "runtime started"
        );

        Ok(Runtime {
            world,
            characters,
            cancel,
            engine_task,
            world_task,
            actor_tasks,
            world_error_rx,
        })
    }
}
