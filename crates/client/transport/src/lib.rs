//! HTTP transport for the game server.
//!
//! [`HttpGameApi`] implements the runtime's `GameApi` seam with `reqwest`.
//! Wire schemas live in `dto` and never leave this crate.
mod client;
mod dto;
mod error;

pub use client::{DEFAULT_BASE_URL, HttpConfig, HttpGameApi};
pub use error::{HttpError, Result};
