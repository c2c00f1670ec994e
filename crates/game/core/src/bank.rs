//! Bank contents and the partial updates pushed after deposits.

use crate::character::ItemStack;

/// Last known bank contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BankSnapshot {
    pub gold: u64,
    pub items: Vec<ItemStack>,
}

impl BankSnapshot {
    pub fn quantity_of(&self, code: &str) -> u32 {
        self.items
            .iter()
            .filter(|item| item.code == code)
            .map(|item| item.quantity)
            .sum()
    }

    /// Replaces each field carried by `update`, leaving the others untouched.
    pub fn apply(&mut self, update: BankUpdate) {
        if let Some(gold) = update.gold {
            self.gold = gold;
        }
        if let Some(items) = update.items {
            self.items = items;
        }
    }
}

/// Notification emitted by a character after a successful deposit.
///
/// The server answers an item deposit with the full item list and a gold
/// deposit with the new gold total, so either field may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BankUpdate {
    pub gold: Option<u64>,
    pub items: Option<Vec<ItemStack>>,
}

impl BankUpdate {
    pub fn items(items: Vec<ItemStack>) -> Self {
        Self {
            gold: None,
            items: Some(items),
        }
    }

    pub fn gold(gold: u64) -> Self {
        Self {
            gold: Some(gold),
            items: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gold.is_none() && self.items.is_none()
    }
}
