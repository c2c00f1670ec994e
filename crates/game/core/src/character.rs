//! Character status as cached by the owning actor.
//!
//! A [`CharacterStatus`] is replaced wholesale from every successful action
//! response. Other components only ever hold clones of it.

use std::collections::BTreeMap;

use crate::catalog::{ElementStats, Skill};
use crate::combat::CombatProfile;
use crate::map::Position;

/// Item code of the currency paid out by the task master.
pub const TASK_COIN: &str = "tasks_coin";

/// Code + quantity pair used for inventory slots and bank rows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ItemStack {
    pub code: String,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(code: impl Into<String>, quantity: u32) -> Self {
        Self {
            code: code.into(),
            quantity,
        }
    }

    /// Inventory slots are reported even when empty.
    pub fn is_empty(&self) -> bool {
        self.quantity == 0 || self.code.is_empty()
    }
}

/// Task category as reported by the task master.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Monsters,
    Resources,
    Items,
    Other(String),
}

impl TaskKind {
    pub fn as_str(&self) -> &str {
        match self {
            TaskKind::Monsters => "monsters",
            TaskKind::Resources => "resources",
            TaskKind::Items => "items",
            TaskKind::Other(raw) => raw,
        }
    }
}

impl From<&str> for TaskKind {
    fn from(raw: &str) -> Self {
        match raw {
            "monsters" => TaskKind::Monsters,
            "resources" => TaskKind::Resources,
            "items" => TaskKind::Items,
            other => TaskKind::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-assigned objective.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub code: String,
    pub kind: TaskKind,
    pub progress: u32,
    pub total: u32,
}

impl Task {
    pub fn new(code: impl Into<String>, kind: TaskKind, progress: u32, total: u32) -> Self {
        Self {
            code: code.into(),
            kind,
            progress,
            total,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.progress)
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.total
    }
}

/// Snapshot of one character.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharacterStatus {
    pub name: String,
    pub position: Position,
    pub level: u32,
    pub gold: u64,
    pub hp: i32,
    pub max_hp: i32,
    pub stamina: i32,
    pub max_inventory: u32,
    pub inventory: Vec<ItemStack>,
    pub skills: BTreeMap<Skill, u32>,
    pub attack: ElementStats,
    pub damage_bonus: ElementStats,
    /// Resistance percent per element.
    pub resistance: ElementStats,
    pub task: Option<Task>,
    /// Cooldown still pending when the snapshot was taken.
    pub cooldown_seconds: u32,
}

impl CharacterStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Total quantity of `code` across all slots.
    pub fn quantity_of(&self, code: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|slot| slot.code == code)
            .map(|slot| slot.quantity)
            .sum()
    }

    /// Items the character can still pick up before the inventory is full.
    pub fn free_inventory_capacity(&self) -> u32 {
        let used: u32 = self
            .inventory
            .iter()
            .filter(|slot| !slot.is_empty())
            .map(|slot| slot.quantity)
            .sum();
        self.max_inventory.saturating_sub(used)
    }

    /// Non-empty slots in inventory order.
    pub fn carried_items(&self) -> impl Iterator<Item = &ItemStack> {
        self.inventory.iter().filter(|slot| !slot.is_empty())
    }

    pub fn skill_level(&self, skill: Skill) -> u32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    /// Gathering skill with the lowest level; ties go to the first in
    /// [`Skill::GATHERING`] order.
    pub fn lowest_gathering_skill(&self) -> Skill {
        Skill::GATHERING
            .into_iter()
            .min_by_key(|skill| self.skill_level(*skill))
            .unwrap_or(Skill::Mining)
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    pub fn combat_profile(&self) -> CombatProfile {
        CombatProfile::new(self.hp, self.attack)
            .with_damage_bonus(self.damage_bonus)
            .with_resistance(self.resistance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_with_inventory(max: u32, slots: Vec<ItemStack>) -> CharacterStatus {
        CharacterStatus {
            max_inventory: max,
            inventory: slots,
            ..CharacterStatus::new("tester")
        }
    }

    #[test]
    fn free_capacity_ignores_empty_slots() {
        let status = status_with_inventory(
            20,
            vec![
                ItemStack::new("copper_ore", 5),
                ItemStack::new("", 0),
                ItemStack::new("ash_wood", 3),
                ItemStack::new("copper_ore", 2),
            ],
        );
        assert_eq!(status.free_inventory_capacity(), 10);
        assert_eq!(status.quantity_of("copper_ore"), 7);
        assert_eq!(status.carried_items().count(), 3);
    }

    #[test]
    fn free_capacity_saturates_at_zero() {
        let status = status_with_inventory(5, vec![ItemStack::new("gudgeon", 9)]);
        assert_eq!(status.free_inventory_capacity(), 0);
    }

    #[test]
    fn lowest_gathering_skill_breaks_ties_in_order() {
        let mut status = CharacterStatus::new("tester");
        status.skills.insert(Skill::Mining, 4);
        status.skills.insert(Skill::Woodcutting, 2);
        status.skills.insert(Skill::Fishing, 2);
        status.skills.insert(Skill::Cooking, 1);
        assert_eq!(status.lowest_gathering_skill(), Skill::Woodcutting);
    }

    #[test]
    fn task_progress_helpers() {
        let task = Task::new("chicken", TaskKind::from("monsters"), 3, 10);
        assert_eq!(task.remaining(), 7);
        assert!(!task.is_complete());
        assert_eq!(TaskKind::from("crafts"), TaskKind::Other("crafts".into()));
        assert_eq!(TaskKind::Other("crafts".into()).to_string(), "crafts");
    }
}
