//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate:
//! the [`GameApi`] seam implemented by transports, the messages exchanged
//! between actors and the engine, and the error taxonomy.

pub mod errors;
pub mod game;
pub mod handle;
pub mod mock;
pub mod report;
pub mod status;

pub use errors::{ActorError, Result, RuntimeError, Severity};
pub use game::{
    ActionResponse, ApiError, ApiResult, Cooldown, FightResult, FightSummary, GameApi, Page,
};
pub use handle::CharacterHandle;
pub use mock::{MockCall, MockGameApi};
pub use report::{Report, ReportCode};
pub use status::StatusCode;
