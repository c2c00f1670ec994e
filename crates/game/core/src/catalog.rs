//! Static catalog entries: resources, monsters, items and the enums they use.
//!
//! Catalog rows are loaded from the game server once (or on a slow refresh
//! timer) and never mutated in place.

use strum::{Display, EnumIter, EnumString};

// ============================================================================
// Elements
// ============================================================================

/// Damage element used for attacks and resistances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Element {
    Fire,
    Water,
    Earth,
    Air,
}

/// One integer stat per element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ElementStats {
    pub fire: i32,
    pub water: i32,
    pub earth: i32,
    pub air: i32,
}

impl ElementStats {
    pub const fn new(fire: i32, water: i32, earth: i32, air: i32) -> Self {
        Self {
            fire,
            water,
            earth,
            air,
        }
    }

    pub const fn get(&self, element: Element) -> i32 {
        match element {
            Element::Fire => self.fire,
            Element::Water => self.water,
            Element::Earth => self.earth,
            Element::Air => self.air,
        }
    }

    pub fn set(&mut self, element: Element, value: i32) {
        match element {
            Element::Fire => self.fire = value,
            Element::Water => self.water = value,
            Element::Earth => self.earth = value,
            Element::Air => self.air = value,
        }
    }

    /// Builder-style variant of [`ElementStats::set`].
    pub fn with(mut self, element: Element, value: i32) -> Self {
        self.set(element, value);
        self
    }
}

// ============================================================================
// Skills
// ============================================================================

/// Character skills that gate resources and crafts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Skill {
    Mining,
    Woodcutting,
    Fishing,
    Weaponcrafting,
    Gearcrafting,
    Jewelrycrafting,
    Cooking,
}

impl Skill {
    /// Skills that are trained by gathering resource nodes.
    pub const GATHERING: [Skill; 3] = [Skill::Mining, Skill::Woodcutting, Skill::Fishing];

    pub fn is_gathering(self) -> bool {
        Self::GATHERING.contains(&self)
    }
}

// ============================================================================
// Catalog rows
// ============================================================================

/// Drop table entry for a resource node or monster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Drop {
    pub code: String,
    /// One in `rate` chance per action.
    pub rate: u32,
    pub min_quantity: u32,
    pub max_quantity: u32,
}

/// Gatherable resource node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub code: String,
    pub name: String,
    pub skill: Skill,
    pub level: u32,
    pub drops: Vec<Drop>,
}

impl Resource {
    pub fn drops_item(&self, item_code: &str) -> bool {
        self.drops.iter().any(|drop| drop.code == item_code)
    }
}

/// Monster catalog entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Monster {
    pub code: String,
    pub name: String,
    pub level: u32,
    pub hp: i32,
    pub attack: ElementStats,
    /// Resistance percent per element.
    pub resistance: ElementStats,
    pub min_gold: u32,
    pub max_gold: u32,
    pub drops: Vec<Drop>,
}

/// Recipe header of a craftable item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Craft {
    pub skill: Skill,
    pub level: u32,
}

/// Item catalog entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Item {
    pub code: String,
    pub name: String,
    pub level: u32,
    /// Server item type (`resource`, `weapon`, `consumable`, ...).
    pub kind: String,
    pub subtype: String,
    pub craft: Option<Craft>,
}

impl Item {
    pub fn is_craftable(&self) -> bool {
        self.craft.is_some()
    }
}
