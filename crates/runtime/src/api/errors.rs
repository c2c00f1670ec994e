//! Unified error types surfaced by the runtime API.
//!
//! Errors are split by how far their blast radius reaches: an [`ActorError`]
//! concerns one character, an [`crate::engine::EngineError`] carries its own
//! [`Severity`], and [`RuntimeError`] is what ends a run.
use thiserror::Error;

use super::game::ApiError;
use crate::command::StepKind;
use crate::engine::EngineError;
use crate::world::WorldError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// How far a failure reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Only the reporting character is affected; it stops receiving commands.
    Character,
    /// The whole agent shuts down.
    Fatal,
}

/// Failure raised inside a character actor and forwarded in its report.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("character {character} could not start")]
    Startup {
        character: String,
        #[source]
        source: ApiError,
    },

    #[error("character {character} received an invalid {step} step: {reason}")]
    InvalidStep {
        character: String,
        step: StepKind,
        reason: &'static str,
    },

    #[error("character {character} failed during {step}")]
    Api {
        character: String,
        step: StepKind,
        #[source]
        source: ApiError,
    },
}

impl ActorError {
    pub fn character(&self) -> &str {
        match self {
            ActorError::Startup { character, .. }
            | ActorError::InvalidStep { character, .. }
            | ActorError::Api { character, .. } => character,
        }
    }

    /// Start-up failures and malformed commands cannot be fixed by parking
    /// one character.
    pub fn severity(&self) -> Severity {
        match self {
            ActorError::Startup { .. } | ActorError::InvalidStep { .. } => Severity::Fatal,
            ActorError::Api { .. } => Severity::Character,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime requires a game api before building")]
    MissingApi,

    #[error("runtime requires at least one character")]
    EmptyRoster,

    #[error("character {0} is listed more than once")]
    DuplicateCharacter(String),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),
}
