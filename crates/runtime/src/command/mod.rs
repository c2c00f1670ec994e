//! Commands dispatched from the decision engine to character actors.
//!
//! A [`Command`] is an ordered list of [`Step`]s executed one after the other
//! by a single actor. Execution stops at the first step that ends with a
//! non-success status; that status is what the actor reports back.
mod step;

use std::fmt;

use thiserror::Error;

pub use step::{
    ActionOutcome, Site, Step, StepContext, StepError, StepKind, StepProgress, StepResult,
};

use crate::api::StatusCode;

/// A step aborted with an error rather than a status code.
#[derive(Debug, Error)]
#[error("step {index} ({step}) aborted")]
pub struct CommandError {
    pub index: usize,
    pub step: StepKind,
    #[source]
    pub source: StepError,
}

impl CommandError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, StepError::Cancelled)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandState {
    Completed,
    /// Step `index` ended with a non-success status.
    Failed { index: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    pub state: CommandState,
    /// Status of the last executed step (`200` when every step succeeded).
    pub code: StatusCode,
    /// Last step that ran, `None` for an empty command.
    pub step: Option<StepKind>,
}

impl CommandOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == CommandState::Completed
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Command {
    steps: Vec<Step>,
}

impl Command {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn single(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step to completion in order.
    pub async fn execute<C>(&self, ctx: &mut C) -> Result<CommandOutcome, CommandError>
    where
        C: StepContext + ?Sized,
    {
        let mut last = None;

        for (index, step) in self.steps.iter().enumerate() {
            let kind = step.kind();
            last = Some(kind);
            let mut progress = StepProgress::default();

            loop {
                let code = step
                    .execute(ctx, &mut progress)
                    .await
                    .map_err(|source| CommandError {
                        index,
                        step: kind,
                        source,
                    })?;

                if !code.is_success() {
                    return Ok(CommandOutcome {
                        state: CommandState::Failed { index },
                        code,
                        step: last,
                    });
                }
                if step.is_done(&progress) {
                    break;
                }
            }
        }

        Ok(CommandOutcome {
            state: CommandState::Completed,
            code: StatusCode::OK,
            step: last,
        })
    }
}

impl From<Step> for Command {
    fn from(step: Step) -> Self {
        Self::single(step)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<empty>");
        }
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
