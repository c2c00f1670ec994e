//! Messages sent from character actors to the decision engine.
use std::fmt;

use super::errors::ActorError;
use super::status::StatusCode;
use crate::command::StepKind;

/// What the report is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportCode {
    /// The actor finished start-up and waits for its first command.
    Started,
    /// Status of the last step of the previous command.
    Status(StatusCode),
    /// The previous command aborted with an error; see [`Report::error`].
    Aborted,
}

impl fmt::Display for ReportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportCode::Started => f.write_str("started"),
            ReportCode::Status(code) => write!(f, "{code}"),
            ReportCode::Aborted => f.write_str("aborted"),
        }
    }
}

/// Outcome of a command (or of start-up) for one character.
#[derive(Debug)]
pub struct Report {
    pub character: String,
    pub code: ReportCode,
    pub step: Option<StepKind>,
    pub error: Option<ActorError>,
}

impl Report {
    pub fn started(character: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            code: ReportCode::Started,
            step: None,
            error: None,
        }
    }

    pub fn status(character: impl Into<String>, code: StatusCode, step: Option<StepKind>) -> Self {
        Self {
            character: character.into(),
            code: ReportCode::Status(code),
            step,
            error: None,
        }
    }

    pub fn failed(character: impl Into<String>, step: Option<StepKind>, error: ActorError) -> Self {
        Self {
            character: character.into(),
            code: ReportCode::Aborted,
            step,
            error: Some(error),
        }
    }

    /// Status code carried by the report, if it is a status report.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self.code {
            ReportCode::Status(code) => Some(code),
            _ => None,
        }
    }
}
