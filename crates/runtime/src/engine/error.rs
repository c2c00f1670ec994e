use thiserror::Error;

use game_core::ContentKind;

use crate::api::{ActorError, Severity, StatusCode};
use crate::command::StepKind;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Actor(#[from] ActorError),

    #[error("character {character} stopped with status {code} during {step:?}")]
    CharacterFailed {
        character: String,
        code: StatusCode,
        step: Option<StepKind>,
    },

    #[error("no {kind} tile on the map")]
    MissingTile { kind: ContentKind },

    #[error("no tile on the map for {code}")]
    NoTileFor { code: String },

    #[error("monster {code} is not in the catalog")]
    UnknownMonster { code: String },

    #[error("no gathering or fighting target available for {character}")]
    NoFallbackTarget { character: String },

    #[error("report from unknown character {character}")]
    UnknownCharacter { character: String },

    #[error("character {character} is no longer accepting commands")]
    CommandChannelClosed { character: String },

    #[error("report channel closed")]
    ReportChannelClosed,

    #[error("every character has stopped")]
    NoActiveCharacters,
}

impl EngineError {
    pub fn severity(&self) -> Severity {
        match self {
            EngineError::Actor(error) => error.severity(),
            EngineError::CharacterFailed { .. } => Severity::Character,
            _ => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
