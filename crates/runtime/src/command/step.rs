//! Single units of character work.
//!
//! A [`Step`] is immutable: the counters tracking how far it got live in a
//! [`StepProgress`] owned by whoever executes it. Every step that targets a
//! tile moves there first; moving onto the current position is free.
use std::fmt;

use async_trait::async_trait;
use strum::Display;
use thiserror::Error;

use game_core::{CharacterStatus, Position};

use crate::api::{ApiError, StatusCode};

pub type StepResult<T> = std::result::Result<T, StepError>;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("invalid {step} step: {reason}")]
    Invalid { step: StepKind, reason: &'static str },

    #[error(transparent)]
    Api(#[from] ApiError),

    /// Shutdown was requested while the step was running.
    #[error("step cancelled")]
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StepKind {
    Move,
    Gather,
    Fight,
    Deposit,
    AcceptTask,
    CompleteTask,
    ExchangeTaskCoins,
}

/// Tile a step acts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    pub position: Position,
    /// Content code expected on the tile (resource, monster, `bank`, ...).
    pub code: String,
}

impl Site {
    pub fn new(position: Position, code: impl Into<String>) -> Self {
        Self {
            position,
            code: code.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Move { target: Position },
    Gather { site: Site, quantity: u32 },
    Fight { site: Site, quantity: u32 },
    /// Deposits every carried stack except the codes in `keep`, then the
    /// carried gold.
    Deposit { site: Site, keep: Vec<String> },
    AcceptTask { site: Site },
    CompleteTask { site: Site },
    ExchangeTaskCoins { site: Site },
}

/// What a single game action achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    Won,
    Lost,
    /// The server refused the action; the step stops here.
    Rejected(StatusCode),
}

impl ActionOutcome {
    pub fn status(self) -> StatusCode {
        match self {
            ActionOutcome::Rejected(code) => code,
            _ => StatusCode::OK,
        }
    }
}

/// Execution counters for one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepProgress {
    pub attempts: u32,
    pub completed: u32,
    pub wins: u32,
    pub losses: u32,
}

impl StepProgress {
    fn record(&mut self, outcome: ActionOutcome) {
        self.attempts += 1;
        match outcome {
            ActionOutcome::Done => self.completed += 1,
            ActionOutcome::Won => {
                self.completed += 1;
                self.wins += 1;
            }
            ActionOutcome::Lost => self.losses += 1,
            ActionOutcome::Rejected(_) => {}
        }
    }
}

/// Character side of step execution.
///
/// Implemented by the character actor: each call issues the game request,
/// refreshes the cached status and waits out the cooldown before returning.
/// Rejections come back as [`ActionOutcome::Rejected`], never as errors.
#[async_trait]
pub trait StepContext: Send {
    fn status(&self) -> &CharacterStatus;

    async fn move_to(&mut self, target: Position) -> StepResult<ActionOutcome>;

    async fn gather(&mut self) -> StepResult<ActionOutcome>;

    async fn fight(&mut self) -> StepResult<ActionOutcome>;

    async fn deposit_all(&mut self, keep: &[String]) -> StepResult<ActionOutcome>;

    async fn accept_task(&mut self) -> StepResult<ActionOutcome>;

    async fn complete_task(&mut self) -> StepResult<ActionOutcome>;

    async fn exchange_task_coins(&mut self) -> StepResult<ActionOutcome>;
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Move { .. } => StepKind::Move,
            Step::Gather { .. } => StepKind::Gather,
            Step::Fight { .. } => StepKind::Fight,
            Step::Deposit { .. } => StepKind::Deposit,
            Step::AcceptTask { .. } => StepKind::AcceptTask,
            Step::CompleteTask { .. } => StepKind::CompleteTask,
            Step::ExchangeTaskCoins { .. } => StepKind::ExchangeTaskCoins,
        }
    }

    /// Tile the step acts on, if any.
    pub fn site(&self) -> Option<&Site> {
        match self {
            Step::Move { .. } => None,
            Step::Gather { site, .. }
            | Step::Fight { site, .. }
            | Step::Deposit { site, .. }
            | Step::AcceptTask { site }
            | Step::CompleteTask { site }
            | Step::ExchangeTaskCoins { site } => Some(site),
        }
    }

    pub fn target(&self) -> Position {
        match self {
            Step::Move { target } => *target,
            other => other.site().map(|site| site.position).unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> StepResult<()> {
        let invalid = |reason: &'static str| -> StepResult<()> {
            Err(StepError::Invalid {
                step: self.kind(),
                reason,
            })
        };
        match self {
            Step::Gather { quantity: 0, .. } | Step::Fight { quantity: 0, .. } => {
                invalid("quantity must be at least 1")
            }
            Step::Gather { site, .. } | Step::Fight { site, .. } if site.code.is_empty() => {
                invalid("target code is empty")
            }
            _ => Ok(()),
        }
    }

    /// Whether the step has nothing left to do.
    ///
    /// Gather is done after `quantity` successful gathers. Fight is done after
    /// `quantity` wins or the first loss. Every other step runs exactly once.
    pub fn is_done(&self, progress: &StepProgress) -> bool {
        match self {
            Step::Gather { quantity, .. } => progress.completed >= *quantity,
            Step::Fight { quantity, .. } => progress.wins >= *quantity || progress.losses > 0,
            _ => progress.attempts >= 1,
        }
    }

    /// Runs one round of the step: the approach move, then a single action.
    ///
    /// Returns the status of the last request issued. Callers loop on this
    /// until [`Step::is_done`] or a non-success status.
    pub async fn execute<C>(&self, ctx: &mut C, progress: &mut StepProgress) -> StepResult<StatusCode>
    where
        C: StepContext + ?Sized,
    {
        self.validate()?;

        let approach = ctx.move_to(self.target()).await?;
        if let ActionOutcome::Rejected(code) = approach {
            progress.record(approach);
            return Ok(code);
        }

        let outcome = match self {
            Step::Move { .. } => approach,
            Step::Gather { .. } => ctx.gather().await?,
            Step::Fight { .. } => ctx.fight().await?,
            Step::Deposit { keep, .. } => ctx.deposit_all(keep).await?,
            Step::AcceptTask { .. } => ctx.accept_task().await?,
            Step::CompleteTask { .. } => ctx.complete_task().await?,
            Step::ExchangeTaskCoins { .. } => ctx.exchange_task_coins().await?,
        };
        progress.record(outcome);
        Ok(outcome.status())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Move { target } => write!(f, "move to {target}"),
            Step::Gather { site, quantity } => {
                write!(f, "gather {quantity}x {} at {}", site.code, site.position)
            }
            Step::Fight { site, quantity } => {
                write!(f, "fight {quantity}x {} at {}", site.code, site.position)
            }
            other => write!(f, "{} at {}", other.kind(), other.target()),
        }
    }
}
