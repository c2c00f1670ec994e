//! Runtime orchestration for the autonomous game agent.
//!
//! This crate wires the game server abstraction, the shared world index and
//! the per-character actors into a supervised runtime. Consumers build a
//! [`Runtime`] with a [`GameApi`] implementation and a roster of character
//! names, then await [`Runtime::run`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the supervisor and builder
//! - [`api`] exposes the game server seam, reports, handles and errors
//! - [`command`] defines the steps characters execute
//! - [`engine`] holds the decision policy
//! - [`world`] keeps the shared world snapshot current
//! - `workers` keeps the actor and engine loops internal to the crate
pub mod api;
pub mod command;
pub mod engine;
pub mod runtime;
pub mod world;

mod workers;

pub use api::{
    ActionResponse, ActorError, ApiError, ApiResult, CharacterHandle, Cooldown, FightResult,
    FightSummary, GameApi, MockCall, MockGameApi, Page, Report, ReportCode, Result, RuntimeError,
    Severity, StatusCode,
};
pub use command::{Command, CommandOutcome, CommandState, Site, Step, StepKind, StepProgress};
pub use engine::{DecisionConfig, DecisionEngine, EngineError};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use workers::{CharacterActor, EngineWorker};
pub use world::{WorldError, WorldIndex, WorldRefresher, WorldTable};
