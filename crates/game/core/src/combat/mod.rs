//! Fight outcome estimation.
//!
//! This module provides pure functions for predicting whether a character can
//! defeat a monster before committing to a fight command. Nothing here touches
//! the network or shared state.
//!
//! # Core Functions
//!
//! - `elemental_damage`: Base elemental attack plus percentage damage bonus
//! - `applied_damage`: Damage left after the defender's resistance
//! - `estimate`: Per-turn damage and turn counts for both sides
//! - `can_win`: Win check with the hard round cap

pub mod damage;
pub mod estimate;

pub use damage::{DAMAGE_BONUS_FACTOR, applied_damage, elemental_damage};
pub use estimate::{CombatProfile, FightEstimate, MAX_FIGHT_ROUNDS, can_win, estimate};
