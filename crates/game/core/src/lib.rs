//! Game domain types and pure rules shared across the agent.
//!
//! `game-core` defines the world snapshot rows (tiles, catalogs, bank), the
//! character status cached by each actor, and the combat estimator used to
//! decide whether a fight is worth starting. Nothing in this crate performs
//! I/O; the runtime and transport crates build on the types re-exported here.
pub mod bank;
pub mod catalog;
pub mod character;
pub mod combat;
pub mod map;

pub use bank::{BankSnapshot, BankUpdate};
pub use catalog::{Craft, Drop, Element, ElementStats, Item, Monster, Resource, Skill};
pub use character::{CharacterStatus, ItemStack, TASK_COIN, Task, TaskKind};
pub use combat::{CombatProfile, FightEstimate, MAX_FIGHT_ROUNDS, can_win, estimate};
pub use map::{ContentKind, MapTile, Position};
