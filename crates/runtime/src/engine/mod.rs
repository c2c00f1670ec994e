//! Decision engine: turns a character report into its next command.
//!
//! The engine keeps no memory between reports beyond its random source. Each
//! decision reads the character's status snapshot and the shared
//! [`WorldIndex`] and applies, in order:
//!
//! 1. inventory-full report → deposit at the nearest bank
//! 2. any other failed report → error tagged with the character
//! 3. no free inventory capacity → deposit
//! 4. no task → accept one (exchanging task coins first when configured)
//! 5. task finished → hand it in
//! 6. resource task → gather the remainder; winnable monster task → fight it
//! 7. otherwise → random gather or fight fallback
mod error;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use game_core::{CharacterStatus, ContentKind, MapTile, TASK_COIN, Task, TaskKind, can_win};

use crate::api::{Report, ReportCode};
use crate::command::{Command, Site, Step};
use crate::world::WorldIndex;

pub use error::EngineError;

/// Tunables for the decision policy.
#[derive(Clone, Debug)]
pub struct DecisionConfig {
    /// Upper bound (inclusive) of the random quantity used by fallback
    /// gather and fight commands.
    pub max_fallback_quantity: u32,
    /// Exchange task coins before accepting a task once the character holds
    /// at least this many. `None` disables exchanges.
    pub task_coin_exchange_threshold: Option<u32>,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            max_fallback_quantity: 9,
            task_coin_exchange_threshold: None,
        }
    }
}

pub struct DecisionEngine {
    world: WorldIndex,
    config: DecisionConfig,
    rng: StdRng,
}

impl DecisionEngine {
    pub fn new(world: WorldIndex, config: DecisionConfig) -> Self {
        Self {
            world,
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic engine for reproducible runs.
    pub fn with_seed(world: WorldIndex, config: DecisionConfig, seed: u64) -> Self {
        Self {
            world,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Chooses the next command for the character behind `report`.
    pub fn decide(
        &mut self,
        report: Report,
        status: &CharacterStatus,
    ) -> Result<Command, EngineError> {
        if let Some(error) = report.error {
            return Err(error.into());
        }

        if let ReportCode::Status(code) = report.code {
            if code.is_inventory_full() {
                return self.deposit(status);
            }
            if !code.is_success() {
                return Err(EngineError::CharacterFailed {
                    character: report.character,
                    code,
                    step: report.step,
                });
            }
        }

        if status.free_inventory_capacity() == 0 {
            return self.deposit(status);
        }

        let Some(task) = &status.task else {
            return self.accept_task(status);
        };

        if task.is_complete() {
            return self.complete_task(status);
        }

        if let Some(command) = self.pursue_task(task, status)? {
            return Ok(command);
        }

        self.fallback(status)
    }

    fn site_of_kind(&self, kind: ContentKind, status: &CharacterStatus) -> Result<Site, EngineError> {
        self.world
            .closest_tile_of_kind(kind, status.position)
            .map(site)
            .ok_or(EngineError::MissingTile { kind })
    }

    fn deposit(&self, status: &CharacterStatus) -> Result<Command, EngineError> {
        let site = self.site_of_kind(ContentKind::Bank, status)?;
        let keep = self.kept_on_deposit(status);
        Ok(Command::single(Step::Deposit { site, keep }))
    }

    /// Task coins stay carried while exchanges are enabled, unless they are
    /// the only thing left to deposit.
    fn kept_on_deposit(&self, status: &CharacterStatus) -> Vec<String> {
        let exchanging = self.config.task_coin_exchange_threshold.is_some();
        let other_stacks = status.carried_items().any(|stack| stack.code != TASK_COIN);
        if exchanging && other_stacks {
            vec![TASK_COIN.to_string()]
        } else {
            Vec::new()
        }
    }

    fn accept_task(&self, status: &CharacterStatus) -> Result<Command, EngineError> {
        let site = self.site_of_kind(ContentKind::TasksMaster, status)?;

        let mut steps = Vec::with_capacity(2);
        if let Some(threshold) = self.config.task_coin_exchange_threshold {
            if status.quantity_of(TASK_COIN) >= threshold {
                steps.push(Step::ExchangeTaskCoins { site: site.clone() });
            }
        }
        steps.push(Step::AcceptTask { site });
        Ok(Command::new(steps))
    }

    fn complete_task(&self, status: &CharacterStatus) -> Result<Command, EngineError> {
        let site = self.site_of_kind(ContentKind::TasksMaster, status)?;
        Ok(Command::single(Step::CompleteTask { site }))
    }

    /// Command working towards the active task, or `None` when the task
    /// cannot be pursued right now.
    fn pursue_task(
        &self,
        task: &Task,
        status: &CharacterStatus,
    ) -> Result<Option<Command>, EngineError> {
        let quantity = task.remaining();
        match &task.kind {
            TaskKind::Resources => {
                let Some(tile) = self.resource_tile(&task.code, status)? else {
                    debug!(
                        target: "runtime::engine",
                        character = %status.name,
                        code = %task.code,
                        "task resource out of reach"
                    );
                    return Ok(None);
                };
                Ok(Some(Command::single(Step::Gather {
                    site: site(tile),
                    quantity,
                })))
            }
            TaskKind::Monsters => {
                let monster = self
                    .world
                    .monster(&task.code)
                    .ok_or_else(|| EngineError::UnknownMonster {
                        code: task.code.clone(),
                    })?;
                if !can_win(&status.combat_profile(), &monster) {
                    debug!(
                        target: "runtime::engine",
                        character = %status.name,
                        monster = %monster.code,
                        "task monster not winnable"
                    );
                    return Ok(None);
                }
                let tile = self
                    .world
                    .closest_tile(&monster.code, status.position)
                    .ok_or_else(|| EngineError::NoTileFor {
                        code: monster.code.clone(),
                    })?;
                Ok(Some(Command::single(Step::Fight {
                    site: site(tile),
                    quantity,
                })))
            }
            TaskKind::Items | TaskKind::Other(_) => Ok(None),
        }
    }

    /// Tile to gather `code` from. `code` is either a resource code or an
    /// item dropped by resources.
    ///
    /// Returns `Ok(None)` when every matching resource is above the
    /// character's skill level.
    fn resource_tile(
        &self,
        code: &str,
        status: &CharacterStatus,
    ) -> Result<Option<MapTile>, EngineError> {
        let mut candidates = self.world.resources_dropping(code);
        if let Some(resource) = self.world.resource(code) {
            candidates.insert(0, resource);
        }
        let known = !candidates.is_empty();
        let reachable: Vec<String> = candidates
            .into_iter()
            .filter(|resource| status.skill_level(resource.skill) >= resource.level)
            .map(|resource| resource.code)
            .collect();

        let tile = match (known, reachable.is_empty()) {
            (true, true) => return Ok(None),
            (true, false) => self.world.closest_tile_among(&reachable, status.position),
            // Crafted items have no node to gather from.
            (false, _) if self.world.item(code).is_some_and(|item| item.is_craftable()) => {
                return Ok(None);
            }
            // Not in the catalog; the code may still be placed on the map.
            (false, _) => self.world.closest_tile(code, status.position),
        };
        tile.map(Some).ok_or_else(|| EngineError::NoTileFor {
            code: code.to_string(),
        })
    }

    fn fallback(&mut self, status: &CharacterStatus) -> Result<Command, EngineError> {
        let gather_first = self.rng.gen_bool(0.5);
        let first = if gather_first {
            self.fallback_gather(status)
        } else {
            self.fallback_fight(status)
        };
        if let Some(command) = first {
            return Ok(command);
        }

        let second = if gather_first {
            self.fallback_fight(status)
        } else {
            self.fallback_gather(status)
        };
        second.ok_or_else(|| EngineError::NoFallbackTarget {
            character: status.name.clone(),
        })
    }

    fn random_quantity(&mut self) -> u32 {
        self.rng.gen_range(1..=self.config.max_fallback_quantity.max(1))
    }

    /// Best resource of the lowest gathering skill that has a tile.
    fn fallback_gather(&mut self, status: &CharacterStatus) -> Option<Command> {
        let skill = status.lowest_gathering_skill();
        let tile = self
            .world
            .resources_for_skill(skill, status.skill_level(skill))
            .into_iter()
            .find_map(|resource| self.world.closest_tile(&resource.code, status.position))?;
        let quantity = self.random_quantity();
        Some(Command::single(Step::Gather {
            site: site(tile),
            quantity,
        }))
    }

    /// Random winnable monster that has a tile.
    fn fallback_fight(&mut self, status: &CharacterStatus) -> Option<Command> {
        let profile = status.combat_profile();
        let mut winnable: Vec<MapTile> = self
            .world
            .monsters()
            .into_iter()
            .filter(|monster| can_win(&profile, monster))
            .filter_map(|monster| self.world.closest_tile(&monster.code, status.position))
            .collect();
        if winnable.is_empty() {
            return None;
        }
        // Catalog order comes from a hash map; sort so seeded runs repeat.
        winnable.sort_by(|a, b| a.code.cmp(&b.code));
        let tile = winnable.swap_remove(self.rng.gen_range(0..winnable.len()));
        let quantity = self.random_quantity();
        Some(Command::single(Step::Fight {
            site: site(tile),
            quantity,
        }))
    }
}

fn site(tile: MapTile) -> Site {
    Site::new(tile.position, tile.code)
}

#[cfg(test)]
mod tests {
    use game_core::{
        Craft, Drop, ElementStats, Item, ItemStack, Monster, Position, Resource, Skill,
    };

    use super::*;
    use crate::api::{ActorError, ApiError, Severity, StatusCode};
    use crate::command::StepKind;
    use crate::world::index_from;

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

    fn monster(code: &str, hp: i32, attack: i32) -> Monster {
        Monster {
            code: code.into(),
            name: code.into(),
            level: 1,
            hp,
            attack: ElementStats::new(0, 0, attack, 0),
            ..Monster::default()
        }
    }

    fn world() -> WorldIndex {
        index_from(
            vec![
                MapTile::new(4, 1, ContentKind::Bank, "bank"),
                MapTile::new(1, 2, ContentKind::TasksMaster, "monsters"),
                MapTile::new(0, 1, ContentKind::Monster, "chicken"),
                MapTile::new(3, -2, ContentKind::Monster, "ogre"),
                MapTile::new(-1, 0, ContentKind::Resource, "ash_tree"),
                MapTile::new(2, 0, ContentKind::Resource, "copper_rocks"),
                MapTile::new(4, 2, ContentKind::Resource, "gudgeon_spot"),
            ],
            vec![monster("chicken", 60, 4), monster("ogre", 4000, 80)],
            vec![
                resource("ash_tree", Skill::Woodcutting, 1, "ash_wood"),
                resource("copper_rocks", Skill::Mining, 1, "copper_ore"),
                resource("iron_rocks", Skill::Mining, 10, "iron_ore"),
                resource("gudgeon_spot", Skill::Fishing, 1, "gudgeon"),
            ],
        )
    }

    fn character() -> CharacterStatus {
        let mut status = CharacterStatus::new("ada");
        status.hp = 120;
        status.max_hp = 120;
        status.max_inventory = 100;
        status.attack = ElementStats::new(0, 0, 10, 0);
        for skill in Skill::GATHERING {
            status.skills.insert(skill, 1);
        }
        status
    }

    fn with_task(kind: TaskKind, code: &str, progress: u32, total: u32) -> CharacterStatus {
        CharacterStatus {
            task: Some(Task::new(code, kind, progress, total)),
            ..character()
        }
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::with_seed(world(), DecisionConfig::default(), 7)
    }

    fn ok_report() -> Report {
        Report::status("ada", StatusCode::OK, Some(StepKind::Gather))
    }

    fn only_step(command: &Command) -> &Step {
        assert_eq!(command.len(), 1, "unexpected command {command}");
        &command.steps()[0]
    }

    #[test]
    fn inventory_full_report_deposits_at_nearest_bank() {
        let report = Report::status("ada", StatusCode::INVENTORY_FULL, Some(StepKind::Gather));
        let command = engine().decide(report, &character()).unwrap();

        match only_step(&command) {
            Step::Deposit { site, keep } => {
                assert_eq!(site.position, Position::new(4, 1));
                assert!(keep.is_empty());
            }
            other => panic!("expected deposit, got {other}"),
        }
    }

    #[test]
    fn zero_capacity_deposits_regardless_of_task() {
        let mut status = with_task(TaskKind::Monsters, "chicken", 10, 10);
        status.inventory = vec![ItemStack::new("feather", 100)];

        let command = engine().decide(ok_report(), &status).unwrap();
        assert_eq!(only_step(&command).kind(), StepKind::Deposit);

        status.task = None;
        let command = engine().decide(Report::started("ada"), &status).unwrap();
        assert_eq!(only_step(&command).kind(), StepKind::Deposit);
    }

    #[test]
    fn generic_failure_is_tagged_with_character() {
        let report = Report::status("ada", StatusCode(598), Some(StepKind::Fight));
        let error = engine().decide(report, &character()).unwrap_err();

        assert!(matches!(
            &error,
            EngineError::CharacterFailed { character, code, step: Some(StepKind::Fight) }
                if character == "ada" && *code == StatusCode(598)
        ));
        assert_eq!(error.severity(), Severity::Character);
    }

    #[test]
    fn actor_errors_keep_their_severity() {
        let report = Report::failed(
            "ada",
            Some(StepKind::Gather),
            ActorError::InvalidStep {
                character: "ada".into(),
                step: StepKind::Gather,
                reason: "quantity must be at least 1",
            },
        );
        assert!(engine().decide(report, &character()).unwrap_err().is_fatal());

        let report = Report::failed(
            "ada",
            Some(StepKind::Move),
            ActorError::Api {
                character: "ada".into(),
                step: StepKind::Move,
                source: ApiError::Transport("reset".into()),
            },
        );
        assert!(!engine().decide(report, &character()).unwrap_err().is_fatal());
    }

    #[test]
    fn no_task_accepts_one_at_tasks_master() {
        let command = engine().decide(Report::started("ada"), &character()).unwrap();

        match only_step(&command) {
            Step::AcceptTask { site } => assert_eq!(site.position, Position::new(1, 2)),
            other => panic!("expected accept task, got {other}"),
        }
    }

    #[test]
    fn task_coins_are_exchanged_before_accepting() {
        let config = DecisionConfig {
            task_coin_exchange_threshold: Some(6),
            ..DecisionConfig::default()
        };
        let mut engine = DecisionEngine::with_seed(world(), config, 7);
        let mut status = character();
        status.inventory = vec![ItemStack::new(TASK_COIN, 6)];

        let command = engine.decide(ok_report(), &status).unwrap();
        let kinds: Vec<StepKind> = command.steps().iter().map(Step::kind).collect();
        assert_eq!(kinds, vec![StepKind::ExchangeTaskCoins, StepKind::AcceptTask]);

        status.inventory = vec![ItemStack::new(TASK_COIN, 5)];
        let command = engine.decide(ok_report(), &status).unwrap();
        assert_eq!(only_step(&command).kind(), StepKind::AcceptTask);
    }

    #[test]
    fn task_coins_are_kept_on_deposit_while_exchanging() {
        let config = DecisionConfig {
            task_coin_exchange_threshold: Some(6),
            ..DecisionConfig::default()
        };
        let mut engine = DecisionEngine::with_seed(world(), config, 7);
        let full = || Report::status("ada", StatusCode::INVENTORY_FULL, Some(StepKind::Gather));
        let mut status = character();
        status.inventory = vec![ItemStack::new(TASK_COIN, 3), ItemStack::new("ash_wood", 97)];

        let command = engine.decide(full(), &status).unwrap();
        match only_step(&command) {
            Step::Deposit { keep, .. } => assert_eq!(keep, &vec![TASK_COIN.to_string()]),
            other => panic!("expected deposit, got {other}"),
        }

        status.inventory = vec![ItemStack::new(TASK_COIN, 100)];
        let command = engine.decide(full(), &status).unwrap();
        match only_step(&command) {
            Step::Deposit { keep, .. } => assert!(keep.is_empty()),
            other => panic!("expected deposit, got {other}"),
        }
    }

    #[test]
    fn finished_task_is_completed_even_with_free_space() {
        let status = with_task(TaskKind::Resources, "ash_wood", 5, 5);
        let command = engine().decide(ok_report(), &status).unwrap();
        assert_eq!(only_step(&command).kind(), StepKind::CompleteTask);
    }

    #[test]
    fn resource_task_gathers_remaining_amount() {
        let status = with_task(TaskKind::Resources, "copper_ore", 2, 8);
        let command = engine().decide(ok_report(), &status).unwrap();

        assert_eq!(
            only_step(&command),
            &Step::Gather {
                site: Site::new(Position::new(2, 0), "copper_rocks"),
                quantity: 6,
            }
        );
    }

    #[test]
    fn crafted_task_item_is_not_gathered() {
        let world = world();
        world.replace_catalogs(
            world.monsters(),
            vec![resource("copper_rocks", Skill::Mining, 1, "copper_ore")],
            vec![Item {
                code: "copper".into(),
                name: "Copper".into(),
                level: 1,
                kind: "resource".into(),
                subtype: "bar".into(),
                craft: Some(Craft {
                    skill: Skill::Mining,
                    level: 1,
                }),
            }],
        );
        let mut engine = DecisionEngine::with_seed(world, DecisionConfig::default(), 7);
        let status = with_task(TaskKind::Resources, "copper", 0, 3);

        let command = engine.decide(ok_report(), &status).unwrap();
        match only_step(&command) {
            Step::Gather { site, .. } => assert_eq!(site.code, "copper_rocks"),
            Step::Fight { site, .. } => assert_eq!(site.code, "chicken"),
            other => panic!("unexpected fallback {other}"),
        }

        let status = with_task(TaskKind::Resources, "mithril", 0, 3);
        let error = engine.decide(ok_report(), &status).unwrap_err();
        assert!(matches!(error, EngineError::NoTileFor { .. }));
    }

    #[test]
    fn winnable_monster_task_fights_remaining_kills() {
        let status = with_task(TaskKind::Monsters, "chicken", 1, 4);
        let command = engine().decide(ok_report(), &status).unwrap();

        assert_eq!(
            only_step(&command),
            &Step::Fight {
                site: Site::new(Position::new(0, 1), "chicken"),
                quantity: 3,
            }
        );
    }

    #[test]
    fn unwinnable_monster_task_falls_back() {
        let status = with_task(TaskKind::Monsters, "ogre", 0, 5);
        for seed in 0..16 {
            let mut engine = DecisionEngine::with_seed(world(), DecisionConfig::default(), seed);
            let command = engine.decide(ok_report(), &status).unwrap();
            match only_step(&command) {
                Step::Fight { site, quantity } => {
                    assert_eq!(site.code, "chicken");
                    assert!((1..=9).contains(quantity));
                }
                Step::Gather { site, quantity } => {
                    assert_eq!(site.code, "copper_rocks");
                    assert!((1..=9).contains(quantity));
                }
                other => panic!("unexpected fallback {other}"),
            }
        }
    }

    #[test]
    fn unknown_task_monster_is_fatal() {
        let status = with_task(TaskKind::Monsters, "dragon", 0, 1);
        let error = engine().decide(ok_report(), &status).unwrap_err();
        assert!(matches!(error, EngineError::UnknownMonster { .. }));
        assert!(error.is_fatal());
    }

    #[test]
    fn missing_bank_is_fatal() {
        let world = index_from(Vec::new(), Vec::new(), Vec::new());
        let mut engine = DecisionEngine::with_seed(world, DecisionConfig::default(), 1);
        let report = Report::status("ada", StatusCode::INVENTORY_FULL, None);

        let error = engine.decide(report, &character()).unwrap_err();
        assert!(matches!(
            error,
            EngineError::MissingTile {
                kind: ContentKind::Bank
            }
        ));
        assert!(error.is_fatal());
    }

    #[test]
    fn fallback_without_targets_fails() {
        let world = index_from(
            vec![MapTile::new(4, 1, ContentKind::Bank, "bank")],
            vec![monster("ogre", 4000, 80)],
            Vec::new(),
        );
        let mut engine = DecisionEngine::with_seed(world, DecisionConfig::default(), 3);
        let status = with_task(TaskKind::Items, "copper_ring", 0, 1);

        let error = engine.decide(ok_report(), &status).unwrap_err();
        assert!(matches!(error, EngineError::NoFallbackTarget { .. }));
    }
}
