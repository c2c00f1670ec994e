//! In-memory game server for tests.
//!
//! [`MockGameApi`] keeps a tiny world (tiles, catalogs, bank, characters) and
//! applies the same rules the real server enforces for the calls the agent
//! makes: movement onto known tiles, gathering only on resource tiles,
//! deposits only at a bank, and so on. Failures can be scripted per call.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use game_core::{
    BankSnapshot, CharacterStatus, ContentKind, ElementStats, Item, ItemStack, MapTile, Monster,
    Position, Resource, Skill, TASK_COIN, Task, TaskKind, can_win,
};

use super::game::{
    ActionResponse, ApiError, ApiResult, Cooldown, FightResult, FightSummary, GameApi, Page,
};
use super::status::StatusCode;

/// Task coins consumed by one exchange.
pub const TASK_EXCHANGE_COST: u32 = 6;

/// Reward handed out by an exchange.
pub const TASK_EXCHANGE_REWARD: &str = "jasper_crystal";

const ALREADY_AT_DESTINATION: u16 = 490;
const SKILL_TOO_LOW: u16 = 493;
const MISSING_ITEM: u16 = 478;
const TASK_ALREADY_ASSIGNED: u16 = 489;
const TASK_NOT_COMPLETED: u16 = 488;
const NO_TASK: u16 = 487;
const INSUFFICIENT_GOLD: u16 = 492;
const NAME_TAKEN: u16 = 494;
const WRONG_TILE: u16 = 598;

/// Game call, as recorded by the mock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockCall {
    Character,
    CreateCharacter,
    Move,
    Gather,
    Fight,
    DepositItem,
    DepositGold,
    AcceptTask,
    CompleteTask,
    ExchangeTaskCoins,
    MapTiles,
    Monsters,
    Resources,
    Items,
    BankItems,
    BankGold,
}

#[derive(Default)]
struct MockState {
    tiles: Vec<MapTile>,
    monsters: Vec<Monster>,
    resources: Vec<Resource>,
    items: Vec<Item>,
    characters: HashMap<String, CharacterStatus>,
    bank: BankSnapshot,
    tasks: VecDeque<Task>,
    failures: HashMap<MockCall, VecDeque<ApiError>>,
    calls: Vec<(MockCall, Option<String>)>,
    latency: HashMap<MockCall, Duration>,
    cooldown_seconds: u32,
    page_size: usize,
}

/// Mock game server for testing without network.
#[derive(Clone)]
pub struct MockGameApi {
    state: Arc<Mutex<MockState>>,
}

impl MockGameApi {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                page_size: 50,
                ..MockState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pause(&self, call: MockCall) {
        let delay = self.state().latency.get(&call).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    // ========================================================================
    // Setup
    // ========================================================================

    pub fn with_tiles(self, tiles: Vec<MapTile>) -> Self {
        self.state().tiles = tiles;
        self
    }

    pub fn with_monsters(self, monsters: Vec<Monster>) -> Self {
        self.state().monsters = monsters;
        self
    }

    pub fn with_resources(self, resources: Vec<Resource>) -> Self {
        self.state().resources = resources;
        self
    }

    pub fn with_items(self, items: Vec<Item>) -> Self {
        self.state().items = items;
        self
    }

    pub fn with_bank(self, bank: BankSnapshot) -> Self {
        self.state().bank = bank;
        self
    }

    pub fn with_character(self, status: CharacterStatus) -> Self {
        self.state().characters.insert(status.name.clone(), status);
        self
    }

    /// Cooldown attached to every successful action.
    pub fn with_cooldown(self, seconds: u32) -> Self {
        self.state().cooldown_seconds = seconds;
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state().page_size = page_size.max(1);
        self
    }

    /// Delays every answer to a world listing `call` by `delay`. The call is
    /// recorded before the pause.
    pub fn with_latency(self, call: MockCall, delay: Duration) -> Self {
        self.state().latency.insert(call, delay);
        self
    }

    /// Queues a task handed out by the next `accept_task`.
    pub fn with_task(self, task: Task) -> Self {
        self.state().tasks.push_back(task);
        self
    }

    /// Replaces the map, as if the world changed between refreshes.
    pub fn set_tiles(&self, tiles: Vec<MapTile>) {
        self.state().tiles = tiles;
    }

    /// Makes the next `call` fail with `error` instead of running.
    pub fn fail_next(&self, call: MockCall, error: ApiError) {
        self.state().failures.entry(call).or_default().push_back(error);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.iter().map(|(call, _)| *call).collect()
    }

    /// Calls issued on behalf of one character.
    pub fn calls_for(&self, name: &str) -> Vec<MockCall> {
        self.state()
            .calls
            .iter()
            .filter(|(_, character)| character.as_deref() == Some(name))
            .map(|(call, _)| *call)
            .collect()
    }

    pub fn count(&self, call: MockCall) -> usize {
        self.state().calls.iter().filter(|(c, _)| *c == call).count()
    }

    pub fn character_state(&self, name: &str) -> Option<CharacterStatus> {
        self.state().characters.get(name).cloned()
    }

    pub fn bank(&self) -> BankSnapshot {
        self.state().bank.clone()
    }
}

impl Default for MockGameApi {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Server rules
// ============================================================================

fn reject(code: u16, message: &str) -> ApiError {
    ApiError::Rejected {
        code: StatusCode(code),
        message: message.to_string(),
    }
}

fn add_item(status: &mut CharacterStatus, code: &str, quantity: u32) {
    match status.inventory.iter_mut().find(|slot| slot.code == code) {
        Some(slot) => slot.quantity += quantity,
        None => status.inventory.push(ItemStack::new(code, quantity)),
    }
}

fn remove_item(status: &mut CharacterStatus, code: &str, quantity: u32) -> bool {
    if status.quantity_of(code) < quantity {
        return false;
    }
    let mut left = quantity;
    for slot in status.inventory.iter_mut().filter(|slot| slot.code == code) {
        let taken = slot.quantity.min(left);
        slot.quantity -= taken;
        left -= taken;
    }
    status.inventory.retain(|slot| !slot.is_empty());
    true
}

fn advance_task(status: &mut CharacterStatus, kind: &TaskKind, codes: &[&str]) {
    if let Some(task) = status.task.as_mut() {
        if &task.kind == kind && codes.contains(&task.code.as_str()) && !task.is_complete() {
            task.progress += 1;
        }
    }
}

fn new_character(name: &str) -> CharacterStatus {
    let mut status = CharacterStatus::new(name);
    status.level = 1;
    status.hp = 120;
    status.max_hp = 120;
    status.stamina = 100;
    status.max_inventory = 100;
    status.attack = ElementStats::new(0, 0, 4, 0);
    for skill in Skill::GATHERING {
        status.skills.insert(skill, 1);
    }
    status
}

fn paginate<T: Clone>(rows: &[T], page: u32, page_size: usize) -> Page<T> {
    let pages = rows.len().div_ceil(page_size).max(1) as u32;
    let start = (page.saturating_sub(1) as usize).saturating_mul(page_size);
    let data = rows.iter().skip(start).take(page_size).cloned().collect();
    Page { data, page, pages }
}

impl MockState {
    fn record(&mut self, call: MockCall, character: Option<&str>) -> ApiResult<()> {
        self.calls.push((call, character.map(str::to_string)));
        match self.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn tile_at(&self, position: Position) -> Option<&MapTile> {
        self.tiles.iter().find(|tile| tile.position == position)
    }

    /// Character plus the tile it stands on.
    fn locate(&self, name: &str) -> ApiResult<(CharacterStatus, Option<MapTile>)> {
        let status = self
            .characters
            .get(name)
            .cloned()
            .ok_or_else(|| reject(498, "character not found"))?;
        let tile = self.tile_at(status.position).cloned();
        Ok((status, tile))
    }

    fn require_tile(tile: Option<MapTile>, kind: ContentKind) -> ApiResult<MapTile> {
        tile.filter(|tile| tile.kind == kind)
            .ok_or_else(|| reject(WRONG_TILE, "required content not found on this map"))
    }

    /// Stores the character and wraps it into an action response.
    fn respond<T>(&mut self, mut status: CharacterStatus, detail: T) -> ActionResponse<T> {
        let cooldown = Cooldown::seconds(self.cooldown_seconds);
        status.cooldown_seconds = cooldown.remaining_seconds;
        self.characters.insert(status.name.clone(), status.clone());
        ActionResponse {
            character: status,
            cooldown,
            detail,
        }
    }

    fn next_task(&mut self) -> Task {
        self.tasks.pop_front().unwrap_or_else(|| {
            let code = self
                .monsters
                .first()
                .map(|monster| monster.code.clone())
                .unwrap_or_else(|| "chicken".to_string());
            Task::new(code, TaskKind::Monsters, 0, 3)
        })
    }
}

#[async_trait]
impl GameApi for MockGameApi {
    async fn character(&self, name: &str) -> ApiResult<CharacterStatus> {
        let mut state = self.state();
        state.record(MockCall::Character, Some(name))?;
        state.locate(name).map(|(status, _)| status)
    }

    async fn create_character(&self, name: &str, _skin: &str) -> ApiResult<CharacterStatus> {
        let mut state = self.state();
        state.record(MockCall::CreateCharacter, Some(name))?;
        if state.characters.contains_key(name) {
            return Err(reject(NAME_TAKEN, "name already used"));
        }
        let status = new_character(name);
        state.characters.insert(name.to_string(), status.clone());
        Ok(status)
    }

    async fn move_to(&self, name: &str, position: Position) -> ApiResult<ActionResponse<MapTile>> {
        let mut state = self.state();
        state.record(MockCall::Move, Some(name))?;
        let (mut status, _) = state.locate(name)?;
        if status.position == position {
            return Err(reject(ALREADY_AT_DESTINATION, "already at destination"));
        }
        let tile = state
            .tile_at(position)
            .cloned()
            .ok_or_else(|| reject(404, "map not found"))?;
        status.position = position;
        Ok(state.respond(status, tile))
    }

    async fn gather(&self, name: &str) -> ApiResult<ActionResponse<Vec<ItemStack>>> {
        let mut state = self.state();
        state.record(MockCall::Gather, Some(name))?;
        let (mut status, tile) = state.locate(name)?;
        let tile = MockState::require_tile(tile, ContentKind::Resource)?;
        let resource = state
            .resources
            .iter()
            .find(|resource| resource.code == tile.code)
            .cloned()
            .ok_or_else(|| reject(WRONG_TILE, "resource not found"))?;

        if status.skill_level(resource.skill) < resource.level {
            return Err(reject(SKILL_TOO_LOW, "skill level too low"));
        }
        if status.free_inventory_capacity() == 0 {
            return Err(reject(StatusCode::INVENTORY_FULL.0, "inventory is full"));
        }

        let gathered: Vec<ItemStack> = resource
            .drops
            .first()
            .map(|drop| ItemStack::new(drop.code.clone(), 1))
            .into_iter()
            .collect();
        for stack in &gathered {
            add_item(&mut status, &stack.code, stack.quantity);
        }
        let mut codes = vec![resource.code.as_str()];
        codes.extend(gathered.iter().map(|stack| stack.code.as_str()));
        advance_task(&mut status, &TaskKind::Resources, &codes);

        Ok(state.respond(status, gathered))
    }

    async fn fight(&self, name: &str) -> ApiResult<ActionResponse<FightSummary>> {
        let mut state = self.state();
        state.record(MockCall::Fight, Some(name))?;
        let (mut status, tile) = state.locate(name)?;
        let tile = MockState::require_tile(tile, ContentKind::Monster)?;
        let monster = state
            .monsters
            .iter()
            .find(|monster| monster.code == tile.code)
            .cloned()
            .ok_or_else(|| reject(WRONG_TILE, "monster not found"))?;

        if status.free_inventory_capacity() == 0 {
            return Err(reject(StatusCode::INVENTORY_FULL.0, "inventory is full"));
        }

        let summary = if can_win(&status.combat_profile(), &monster) {
            status.gold += u64::from(monster.min_gold);
            advance_task(&mut status, &TaskKind::Monsters, &[monster.code.as_str()]);
            FightSummary {
                result: FightResult::Win,
                turns: 1,
                xp: monster.level * 10,
                gold: monster.min_gold,
                drops: Vec::new(),
            }
        } else {
            status.hp = 1;
            status.position = Position::ORIGIN;
            FightSummary {
                result: FightResult::Loss,
                turns: 1,
                xp: 0,
                gold: 0,
                drops: Vec::new(),
            }
        };

        Ok(state.respond(status, summary))
    }

    async fn deposit_item(
        &self,
        name: &str,
        code: &str,
        quantity: u32,
    ) -> ApiResult<ActionResponse<Vec<ItemStack>>> {
        let mut state = self.state();
        state.record(MockCall::DepositItem, Some(name))?;
        let (mut status, tile) = state.locate(name)?;
        MockState::require_tile(tile, ContentKind::Bank)?;

        if quantity == 0 || !remove_item(&mut status, code, quantity) {
            return Err(reject(MISSING_ITEM, "missing item or insufficient quantity"));
        }
        match state.bank.items.iter_mut().find(|item| item.code == code) {
            Some(item) => item.quantity += quantity,
            None => state.bank.items.push(ItemStack::new(code, quantity)),
        }
        let items = state.bank.items.clone();

        Ok(state.respond(status, items))
    }

    async fn deposit_gold(&self, name: &str, quantity: u64) -> ApiResult<ActionResponse<u64>> {
        let mut state = self.state();
        state.record(MockCall::DepositGold, Some(name))?;
        let (mut status, tile) = state.locate(name)?;
        MockState::require_tile(tile, ContentKind::Bank)?;

        if quantity == 0 || status.gold < quantity {
            return Err(reject(INSUFFICIENT_GOLD, "insufficient gold"));
        }
        status.gold -= quantity;
        state.bank.gold += quantity;
        let gold = state.bank.gold;

        Ok(state.respond(status, gold))
    }

    async fn accept_task(&self, name: &str) -> ApiResult<ActionResponse<Task>> {
        let mut state = self.state();
        state.record(MockCall::AcceptTask, Some(name))?;
        let (mut status, tile) = state.locate(name)?;
        MockState::require_tile(tile, ContentKind::TasksMaster)?;

        if status.task.is_some() {
            return Err(reject(TASK_ALREADY_ASSIGNED, "character already has a task"));
        }
        let task = state.next_task();
        status.task = Some(task.clone());

        Ok(state.respond(status, task))
    }

    async fn complete_task(&self, name: &str) -> ApiResult<ActionResponse<ItemStack>> {
        let mut state = self.state();
        state.record(MockCall::CompleteTask, Some(name))?;
        let (mut status, tile) = state.locate(name)?;
        MockState::require_tile(tile, ContentKind::TasksMaster)?;

        match &status.task {
            None => return Err(reject(NO_TASK, "character has no task")),
            Some(task) if !task.is_complete() => {
                return Err(reject(TASK_NOT_COMPLETED, "task not completed"));
            }
            Some(_) => {}
        }
        status.task = None;
        let reward = ItemStack::new(TASK_COIN, 1);
        add_item(&mut status, &reward.code, reward.quantity);

        Ok(state.respond(status, reward))
    }

    async fn exchange_task_coins(&self, name: &str) -> ApiResult<ActionResponse<ItemStack>> {
        let mut state = self.state();
        state.record(MockCall::ExchangeTaskCoins, Some(name))?;
        let (mut status, tile) = state.locate(name)?;
        MockState::require_tile(tile, ContentKind::TasksMaster)?;

        if !remove_item(&mut status, TASK_COIN, TASK_EXCHANGE_COST) {
            return Err(reject(MISSING_ITEM, "not enough task coins"));
        }
        let reward = ItemStack::new(TASK_EXCHANGE_REWARD, 1);
        add_item(&mut status, &reward.code, reward.quantity);

        Ok(state.respond(status, reward))
    }

    async fn map_tiles(&self, page: u32) -> ApiResult<Page<MapTile>> {
        let listing = {
            let mut state = self.state();
            state.record(MockCall::MapTiles, None)?;
            paginate(&state.tiles, page, state.page_size)
        };
        self.pause(MockCall::MapTiles).await;
        Ok(listing)
    }

    async fn monsters(&self, page: u32) -> ApiResult<Page<Monster>> {
        let listing = {
            let mut state = self.state();
            state.record(MockCall::Monsters, None)?;
            paginate(&state.monsters, page, state.page_size)
        };
        self.pause(MockCall::Monsters).await;
        Ok(listing)
    }

    async fn resources(&self, page: u32) -> ApiResult<Page<Resource>> {
        let listing = {
            let mut state = self.state();
            state.record(MockCall::Resources, None)?;
            paginate(&state.resources, page, state.page_size)
        };
        self.pause(MockCall::Resources).await;
        Ok(listing)
    }

    async fn items(&self, page: u32) -> ApiResult<Page<Item>> {
        let listing = {
            let mut state = self.state();
            state.record(MockCall::Items, None)?;
            paginate(&state.items, page, state.page_size)
        };
        self.pause(MockCall::Items).await;
        Ok(listing)
    }

    async fn bank_items(&self, page: u32) -> ApiResult<Page<ItemStack>> {
        let mut state = self.state();
        state.record(MockCall::BankItems, None)?;
        Ok(paginate(&state.bank.items, page, state.page_size))
    }

    async fn bank_gold(&self) -> ApiResult<u64> {
        let mut state = self.state();
        state.record(MockCall::BankGold, None)?;
        Ok(state.bank.gold)
    }
}
