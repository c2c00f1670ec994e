//! Shared fixtures for runtime integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use game_core::{
    CharacterStatus, ContentKind, Drop, ElementStats, MapTile, Monster, Resource, Skill,
};
use runtime::{DecisionConfig, MockGameApi, RuntimeConfig};

pub const BANK: (i32, i32) = (4, 1);
pub const TASKS_MASTER: (i32, i32) = (1, 2);

fn drop_of(code: &str) -> Drop {
    Drop {
        code: code.into(),
        rate: 1,
        min_quantity: 1,
        max_quantity: 1,
    }
}

/// Small map with one of everything the agent needs.
pub fn world() -> MockGameApi {
    MockGameApi::new()
        .with_page_size(3)
        .with_tiles(vec![
            MapTile::new(0, 0, ContentKind::None, ""),
            MapTile::new(BANK.0, BANK.1, ContentKind::Bank, "bank"),
            MapTile::new(TASKS_MASTER.0, TASKS_MASTER.1, ContentKind::TasksMaster, "monsters"),
            MapTile::new(0, 1, ContentKind::Monster, "chicken"),
            MapTile::new(2, 0, ContentKind::Resource, "copper_rocks"),
            MapTile::new(-1, 0, ContentKind::Resource, "ash_tree"),
            MapTile::new(4, 2, ContentKind::Resource, "gudgeon_spot"),
        ])
        .with_monsters(vec![Monster {
            code: "chicken".into(),
            name: "Chicken".into(),
            level: 1,
            hp: 60,
            attack: ElementStats::new(0, 4, 0, 0),
            min_gold: 1,
            max_gold: 3,
            drops: vec![drop_of("feather")],
            ..Monster::default()
        }])
        .with_resources(vec![
            Resource {
                code: "copper_rocks".into(),
                name: "Copper Rocks".into(),
                skill: Skill::Mining,
                level: 1,
                drops: vec![drop_of("copper_ore")],
            },
            Resource {
                code: "ash_tree".into(),
                name: "Ash Tree".into(),
                skill: Skill::Woodcutting,
                level: 1,
                drops: vec![drop_of("ash_wood")],
            },
            Resource {
                code: "gudgeon_spot".into(),
                name: "Gudgeon Fishing Spot".into(),
                skill: Skill::Fishing,
                level: 1,
                drops: vec![drop_of("gudgeon")],
            },
        ])
}

/// Level 1 character able to beat a chicken.
pub fn character(name: &str) -> CharacterStatus {
    let mut status = CharacterStatus::new(name);
    status.level = 1;
    status.hp = 120;
    status.max_hp = 120;
    status.max_inventory = 100;
    status.attack = ElementStats::new(0, 0, 10, 0);
    for skill in Skill::GATHERING {
        status.skills.insert(skill, 1);
    }
    status
}

pub fn config() -> RuntimeConfig {
    RuntimeConfig {
        map_refresh_interval: Duration::from_millis(20),
        decision: DecisionConfig::default(),
        rng_seed: Some(42),
        ..RuntimeConfig::default()
    }
}

/// Polls `condition` until it holds, panicking after five seconds.
pub async fn eventually<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

/// Awaits a future that must finish within five seconds.
pub async fn within<T>(what: &str, future: impl Future<Output = T>) -> T {
    match tokio::time::timeout(Duration::from_secs(5), future).await {
        Ok(value) => value,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}
