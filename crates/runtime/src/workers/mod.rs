//! Worker tasks that back the runtime orchestration.
//!
//! One [`CharacterActor`] runs per character and an [`EngineWorker`] turns
//! their reports into commands. The world refresher lives next to the index
//! it maintains in [`crate::world`].

mod character;
mod engine;

pub use character::CharacterActor;
pub use engine::EngineWorker;
