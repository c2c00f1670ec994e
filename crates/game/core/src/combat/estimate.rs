//! Win/loss estimation against a catalog monster.

use strum::IntoEnumIterator;

use super::damage::{applied_damage, elemental_damage};
use crate::catalog::{Element, ElementStats, Monster};

/// Fights that would last this many rounds or more are treated as lost.
pub const MAX_FIGHT_ROUNDS: f64 = 100.0;

/// Fighting stats of the attacking character.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CombatProfile {
    pub hp: i32,
    /// Base attack per element.
    pub attack: ElementStats,
    /// `dmg_<element>` bonus per element.
    pub damage_bonus: ElementStats,
    /// Resistance percent per element.
    pub resistance: ElementStats,
}

impl CombatProfile {
    pub fn new(hp: i32, attack: ElementStats) -> Self {
        Self {
            hp,
            attack,
            ..Self::default()
        }
    }

    pub fn with_damage_bonus(mut self, damage_bonus: ElementStats) -> Self {
        self.damage_bonus = damage_bonus;
        self
    }

    pub fn with_resistance(mut self, resistance: ElementStats) -> Self {
        self.resistance = resistance;
        self
    }
}

/// Intermediate numbers of a fight estimate.
///
/// Turn counts are real-valued; a side that deals no damage needs
/// `f64::INFINITY` turns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FightEstimate {
    pub attacker_damage: i32,
    pub monster_damage: i32,
    pub turns_to_kill_monster: f64,
    pub turns_to_kill_attacker: f64,
}

impl FightEstimate {
    /// True when the attacker finishes first and within the round cap.
    pub fn is_win(&self) -> bool {
        self.turns_to_kill_monster < self.turns_to_kill_attacker
            && self.turns_to_kill_monster < MAX_FIGHT_ROUNDS
    }
}

/// Computes per-turn damage for both sides.
///
/// # Formula
///
/// ```text
/// attacker_damage = Σ_e applied(elemental(attack[e], bonus[e]), monster.res[e])
/// monster_damage  = Σ_e applied(monster.attack[e], attacker.res[e])
/// turns_to_kill_monster  = monster.hp / attacker_damage
/// turns_to_kill_attacker = attacker.hp / monster_damage
/// ```
///
/// Monsters usually attack with a single element, in which case the sum
/// reduces to that element.
pub fn estimate(profile: &CombatProfile, monster: &Monster) -> FightEstimate {
    let mut attacker_damage = 0;
    let mut monster_damage = 0;

    for element in Element::iter() {
        let outgoing = elemental_damage(
            profile.attack.get(element),
            profile.damage_bonus.get(element),
        );
        attacker_damage += applied_damage(outgoing, monster.resistance.get(element));
        monster_damage += applied_damage(
            monster.attack.get(element),
            profile.resistance.get(element),
        );
    }

    FightEstimate {
        attacker_damage,
        monster_damage,
        turns_to_kill_monster: turns_to_kill(monster.hp, attacker_damage),
        turns_to_kill_attacker: turns_to_kill(profile.hp, monster_damage),
    }
}

/// Returns true if `profile` is expected to defeat `monster`.
pub fn can_win(profile: &CombatProfile, monster: &Monster) -> bool {
    estimate(profile, monster).is_win()
}

fn turns_to_kill(hp: i32, damage_per_turn: i32) -> f64 {
    if damage_per_turn <= 0 {
        return f64::INFINITY;
    }
    f64::from(hp) / f64::from(damage_per_turn)
}
