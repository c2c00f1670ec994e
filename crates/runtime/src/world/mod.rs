//! Shared, periodically refreshed snapshot of the game world.
//!
//! [`WorldIndex`] is a cheap cloneable handle over the latest tables: map
//! tiles, the monster/resource/item catalogs and the bank. Readers always get
//! owned copies; a refresh fetches the new table first and swaps it in under
//! a short write lock, so readers see either the old table or the new one.
mod refresh;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use game_core::{
    BankSnapshot, BankUpdate, ContentKind, Item, MapTile, Monster, Position, Resource, Skill,
};

use crate::api::ApiError;

pub use refresh::{WorldRefresher, WorldTable};

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("failed to fetch {table} page {page}")]
    Fetch {
        table: WorldTable,
        page: u32,
        #[source]
        source: ApiError,
    },
}

#[derive(Default)]
struct WorldTables {
    tiles: Vec<MapTile>,
    monsters: HashMap<String, Monster>,
    resources: Vec<Resource>,
    items: HashMap<String, Item>,
    bank: BankSnapshot,
}

#[derive(Clone, Default)]
pub struct WorldIndex {
    tables: Arc<RwLock<WorldTables>>,
}

impl WorldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a table half-written:
    // every writer only assigns a fully built value.
    fn read(&self) -> RwLockReadGuard<'_, WorldTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WorldTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Map queries
    // ========================================================================

    /// Nearest tile whose content code is `code`. Ties keep the first tile in
    /// map order.
    pub fn closest_tile(&self, code: &str, from: Position) -> Option<MapTile> {
        closest(self.read().tiles.iter().filter(|tile| tile.code == code), from)
    }

    /// Nearest tile holding content of `kind`.
    pub fn closest_tile_of_kind(&self, kind: ContentKind, from: Position) -> Option<MapTile> {
        closest(self.read().tiles.iter().filter(|tile| tile.kind == kind), from)
    }

    /// Nearest tile whose code is any of `codes`.
    pub fn closest_tile_among(&self, codes: &[String], from: Position) -> Option<MapTile> {
        closest(
            self.read()
                .tiles
                .iter()
                .filter(|tile| codes.iter().any(|code| *code == tile.code)),
            from,
        )
    }

    pub fn tiles_by_content(&self, kind: ContentKind) -> Vec<MapTile> {
        self.read()
            .tiles
            .iter()
            .filter(|tile| tile.kind == kind)
            .cloned()
            .collect()
    }

    pub fn tile_count(&self) -> usize {
        self.read().tiles.len()
    }

    // ========================================================================
    // Catalog queries
    // ========================================================================

    /// Resources of `skill` a character at `level` can gather, highest level
    /// first.
    pub fn resources_for_skill(&self, skill: Skill, level: u32) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .read()
            .resources
            .iter()
            .filter(|resource| resource.skill == skill && resource.level <= level)
            .cloned()
            .collect();
        resources.sort_by(|a, b| b.level.cmp(&a.level));
        resources
    }

    /// Resources whose drop table contains `item_code`.
    pub fn resources_dropping(&self, item_code: &str) -> Vec<Resource> {
        self.read()
            .resources
            .iter()
            .filter(|resource| resource.drops_item(item_code))
            .cloned()
            .collect()
    }

    pub fn resource(&self, code: &str) -> Option<Resource> {
        self.read()
            .resources
            .iter()
            .find(|resource| resource.code == code)
            .cloned()
    }

    pub fn monster(&self, code: &str) -> Option<Monster> {
        self.read().monsters.get(code).cloned()
    }

    pub fn monsters(&self) -> Vec<Monster> {
        self.read().monsters.values().cloned().collect()
    }

    pub fn item(&self, code: &str) -> Option<Item> {
        self.read().items.get(code).cloned()
    }

    pub fn item_count(&self) -> usize {
        self.read().items.len()
    }

    // ========================================================================
    // Bank
    // ========================================================================

    pub fn bank(&self) -> BankSnapshot {
        self.read().bank.clone()
    }

    pub fn apply_bank_update(&self, update: BankUpdate) {
        self.write().bank.apply(update);
    }

    // ========================================================================
    // Table replacement
    // ========================================================================

    pub(crate) fn replace_tiles(&self, tiles: Vec<MapTile>) {
        self.write().tiles = tiles;
    }

    /// Swaps the three catalogs under one write lock.
    pub(crate) fn replace_catalogs(
        &self,
        monsters: Vec<Monster>,
        resources: Vec<Resource>,
        items: Vec<Item>,
    ) {
        let monsters = monsters
            .into_iter()
            .map(|monster| (monster.code.clone(), monster))
            .collect();
        let items = items
            .into_iter()
            .map(|item| (item.code.clone(), item))
            .collect();

        let mut tables = self.write();
        tables.monsters = monsters;
        tables.resources = resources;
        tables.items = items;
    }

    pub(crate) fn replace_bank(&self, bank: BankSnapshot) {
        self.write().bank = bank;
    }
}

fn closest<'a>(tiles: impl Iterator<Item = &'a MapTile>, from: Position) -> Option<MapTile> {
    let mut best: Option<(&MapTile, u32)> = None;
    for tile in tiles {
        let distance = from.manhattan_distance(tile.position);
        if best.is_none_or(|(_, shortest)| distance < shortest) {
            best = Some((tile, distance));
        }
    }
    best.map(|(tile, _)| tile.clone())
}

/// Builds an index directly from tables, bypassing the API.
#[cfg(test)]
pub(crate) fn index_from(
    tiles: Vec<MapTile>,
    monsters: Vec<Monster>,
    resources: Vec<Resource>,
) -> WorldIndex {
    let index = WorldIndex::new();
    index.replace_tiles(tiles);
    index.replace_catalogs(monsters, resources, Vec::new());
    index
}

#[cfg(test)]
mod tests {
    use game_core::{Drop, ItemStack};

    use super::*;

    fn resource(code: &str, skill: Skill, level: u32, drop: &str) -> Resource {
        Resource {
            code: code.into(),
            name: code.into(),
            skill,
            level,
            drops: vec![Drop {
                code: drop.into(),
                rate: 1,
                min_quantity: 1,
                max_quantity: 1,
            }],
        }
    }

    fn sample() -> WorldIndex {
        index_from(
            vec![
                MapTile::new(3, 0, ContentKind::Bank, "bank"),
                MapTile::new(0, 3, ContentKind::Bank, "bank"),
                MapTile::new(-1, 0, ContentKind::Resource, "ash_tree"),
                MapTile::new(5, 5, ContentKind::Resource, "ash_tree"),
                MapTile::new(2, 2, ContentKind::Resource, "copper_rocks"),
                MapTile::new(1, 2, ContentKind::TasksMaster, "monsters"),
            ],
            Vec::new(),
            vec![
                resource("copper_rocks", Skill::Mining, 1, "copper_ore"),
                resource("iron_rocks", Skill::Mining, 10, "iron_ore"),
                resource("coal_rocks", Skill::Mining, 20, "coal"),
                resource("ash_tree", Skill::Woodcutting, 1, "ash_wood"),
            ],
        )
    }

    #[test]
    fn closest_tile_picks_minimum_distance() {
        let world = sample();
        let tile = world.closest_tile("ash_tree", Position::new(4, 4)).unwrap();
        assert_eq!(tile.position, Position::new(5, 5));
        assert!(world.closest_tile("gold_rocks", Position::ORIGIN).is_none());
    }

    #[test]
    fn closest_tile_prefers_nearer_of_two_matches() {
        let world = index_from(
            vec![
                MapTile::new(0, 0, ContentKind::Resource, "ash_tree"),
                MapTile::new(3, 1, ContentKind::Resource, "ash_tree"),
            ],
            Vec::new(),
            Vec::new(),
        );
        let tile = world.closest_tile("ash_tree", Position::new(1, 1)).unwrap();
        assert_eq!(tile.position, Position::new(0, 0));
    }

    #[test]
    fn closest_tile_ties_keep_map_order() {
        let world = sample();
        let bank = world
            .closest_tile_of_kind(ContentKind::Bank, Position::ORIGIN)
            .unwrap();
        assert_eq!(bank.position, Position::new(3, 0));
    }

    #[test]
    fn resources_for_skill_filters_and_sorts() {
        let world = sample();
        let codes: Vec<String> = world
            .resources_for_skill(Skill::Mining, 15)
            .into_iter()
            .map(|resource| resource.code)
            .collect();
        assert_eq!(codes, vec!["iron_rocks", "copper_rocks"]);
        assert!(world.resources_for_skill(Skill::Fishing, 99).is_empty());
    }

    #[test]
    fn resources_dropping_matches_drop_tables() {
        let world = sample();
        let dropping = world.resources_dropping("ash_wood");
        assert_eq!(dropping.len(), 1);
        assert_eq!(dropping[0].code, "ash_tree");
    }

    #[test]
    fn tiles_by_content_filters_kind() {
        let world = sample();
        assert_eq!(world.tiles_by_content(ContentKind::Bank).len(), 2);
        assert_eq!(world.tiles_by_content(ContentKind::Monster).len(), 0);
    }

    #[test]
    fn bank_updates_are_partial() {
        let world = sample();
        world.apply_bank_update(BankUpdate::gold(40));
        world.apply_bank_update(BankUpdate::items(vec![ItemStack::new("ash_wood", 2)]));

        let bank = world.bank();
        assert_eq!(bank.gold, 40);
        assert_eq!(bank.quantity_of("ash_wood"), 2);
    }

    #[test]
    fn catalogs_are_replaced_together() {
        let world = sample();
        let ring = Item {
            code: "copper_ring".into(),
            name: "Copper Ring".into(),
            level: 5,
            kind: "ring".into(),
            ..Item::default()
        };
        world.replace_catalogs(Vec::new(), Vec::new(), vec![ring.clone()]);

        assert_eq!(world.item("copper_ring"), Some(ring));
        assert!(world.item("ash_wood").is_none());
        assert_eq!(world.item_count(), 1);
        assert!(world.resource("ash_tree").is_none());
        assert!(world.monsters().is_empty());
    }

    #[test]
    fn clones_share_tables() {
        let world = sample();
        let other = world.clone();
        other.replace_tiles(Vec::new());
        assert_eq!(world.tile_count(), 0);
    }
}
