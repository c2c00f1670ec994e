//! Wire schemas of the game server's JSON API.
//!
//! Every payload is decoded into these structs and converted into
//! `game-core` types right here, so nothing past the transport sees server
//! spellings. Unknown content types and skills decode leniently: a tile with
//! unrecognised content becomes an empty tile, a resource with an unknown
//! skill is dropped from the catalog.
use std::collections::BTreeMap;

use serde::Deserialize;

use game_core::{
    CharacterStatus, ContentKind, Craft, Drop, ElementStats, Item, ItemStack, MapTile, Monster,
    Position, Resource, Skill, Task, TaskKind,
};
use runtime::{ActionResponse, Cooldown, FightResult, FightSummary, Page};

// ============================================================================
// Envelopes
// ============================================================================

/// Every success body wraps its payload in `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageDto<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub pages: Option<u32>,
}

impl<T> PageDto<T> {
    /// `requested` stands in for a missing `page`; a missing `pages` ends
    /// iteration on this page.
    pub fn into_page<U>(self, requested: u32, convert: impl FnMut(T) -> Option<U>) -> Page<U> {
        let page = self.page.unwrap_or(requested);
        Page {
            data: self.data.into_iter().filter_map(convert).collect(),
            page,
            pages: self.pages.unwrap_or(page),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDto {
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Shared rows
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SimpleItemDto {
    pub code: String,
    pub quantity: u32,
}

impl From<SimpleItemDto> for ItemStack {
    fn from(dto: SimpleItemDto) -> Self {
        ItemStack::new(dto.code, dto.quantity)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DropDto {
    pub code: String,
    #[serde(default)]
    pub rate: u32,
    #[serde(default)]
    pub min_quantity: u32,
    #[serde(default)]
    pub max_quantity: u32,
}

impl From<DropDto> for Drop {
    fn from(dto: DropDto) -> Self {
        Drop {
            code: dto.code,
            rate: dto.rate,
            min_quantity: dto.min_quantity,
            max_quantity: dto.max_quantity,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CooldownDto {
    #[serde(default)]
    pub total_seconds: u32,
    #[serde(default)]
    pub remaining_seconds: u32,
}

impl From<CooldownDto> for Cooldown {
    fn from(dto: CooldownDto) -> Self {
        Cooldown {
            total_seconds: dto.total_seconds,
            remaining_seconds: dto.remaining_seconds,
        }
    }
}

// ============================================================================
// Character
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CharacterDto {
    pub name: String,
    pub level: u32,
    pub gold: u64,
    pub hp: i32,
    pub max_hp: i32,
    pub stamina: i32,
    pub x: i32,
    pub y: i32,

    pub mining_level: u32,
    pub woodcutting_level: u32,
    pub fishing_level: u32,
    pub weaponcrafting_level: u32,
    pub gearcrafting_level: u32,
    pub jewelrycrafting_level: u32,
    pub cooking_level: u32,

    pub attack_fire: i32,
    pub attack_water: i32,
    pub attack_earth: i32,
    pub attack_air: i32,
    pub dmg_fire: i32,
    pub dmg_water: i32,
    pub dmg_earth: i32,
    pub dmg_air: i32,
    pub res_fire: i32,
    pub res_water: i32,
    pub res_earth: i32,
    pub res_air: i32,

    pub cooldown: u32,
    pub task: String,
    pub task_type: String,
    pub task_progress: u32,
    pub task_total: u32,
    pub inventory_max_items: u32,
    pub inventory: Vec<SimpleItemDto>,
}

impl From<CharacterDto> for CharacterStatus {
    fn from(dto: CharacterDto) -> Self {
        let skills = BTreeMap::from([
            (Skill::Mining, dto.mining_level),
            (Skill::Woodcutting, dto.woodcutting_level),
            (Skill::Fishing, dto.fishing_level),
            (Skill::Weaponcrafting, dto.weaponcrafting_level),
            (Skill::Gearcrafting, dto.gearcrafting_level),
            (Skill::Jewelrycrafting, dto.jewelrycrafting_level),
            (Skill::Cooking, dto.cooking_level),
        ]);
        // The server reports an empty code when no task is held.
        let task = (!dto.task.is_empty()).then(|| {
            Task::new(
                dto.task,
                TaskKind::from(dto.task_type.as_str()),
                dto.task_progress,
                dto.task_total,
            )
        });

        CharacterStatus {
            name: dto.name,
            position: Position::new(dto.x, dto.y),
            level: dto.level,
            gold: dto.gold,
            hp: dto.hp,
            max_hp: dto.max_hp,
            stamina: dto.stamina,
            max_inventory: dto.inventory_max_items,
            inventory: dto
                .inventory
                .into_iter()
                .map(ItemStack::from)
                .filter(|item| !item.is_empty())
                .collect(),
            skills,
            attack: ElementStats::new(
                dto.attack_fire,
                dto.attack_water,
                dto.attack_earth,
                dto.attack_air,
            ),
            damage_bonus: ElementStats::new(dto.dmg_fire, dto.dmg_water, dto.dmg_earth, dto.dmg_air),
            resistance: ElementStats::new(dto.res_fire, dto.res_water, dto.res_earth, dto.res_air),
            task,
            cooldown_seconds: dto.cooldown,
        }
    }
}

// ============================================================================
// Map
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct MapDto {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub content: Option<ContentDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
}

impl From<MapDto> for MapTile {
    fn from(dto: MapDto) -> Self {
        let known = dto.content.and_then(|content| {
            let kind = content.kind.parse::<ContentKind>().ok()?;
            (kind != ContentKind::None).then_some((kind, content.code))
        });
        match known {
            Some((kind, code)) => MapTile::new(dto.x, dto.y, kind, code),
            None => MapTile::empty(dto.x, dto.y),
        }
    }
}

// ============================================================================
// Catalogs
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MonsterDto {
    pub code: String,
    pub name: String,
    pub level: u32,
    pub hp: i32,
    pub attack_fire: i32,
    pub attack_water: i32,
    pub attack_earth: i32,
    pub attack_air: i32,
    pub res_fire: i32,
    pub res_water: i32,
    pub res_earth: i32,
    pub res_air: i32,
    pub min_gold: u32,
    pub max_gold: u32,
    pub drops: Vec<DropDto>,
}

impl From<MonsterDto> for Monster {
    fn from(dto: MonsterDto) -> Self {
        Monster {
            code: dto.code,
            name: dto.name,
            level: dto.level,
            hp: dto.hp,
            attack: ElementStats::new(
                dto.attack_fire,
                dto.attack_water,
                dto.attack_earth,
                dto.attack_air,
            ),
            resistance: ElementStats::new(dto.res_fire, dto.res_water, dto.res_earth, dto.res_air),
            min_gold: dto.min_gold,
            max_gold: dto.max_gold,
            drops: dto.drops.into_iter().map(Drop::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceDto {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub skill: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub drops: Vec<DropDto>,
}

impl ResourceDto {
    pub fn into_resource(self) -> Option<Resource> {
        let Ok(skill) = self.skill.parse::<Skill>() else {
            tracing::debug!(
                target: "client::http",
                resource = %self.code,
                skill = %self.skill,
                "skipping resource with unknown skill"
            );
            return None;
        };
        Some(Resource {
            code: self.code,
            name: self.name,
            skill,
            level: self.level,
            drops: self.drops.into_iter().map(Drop::from).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemDto {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: u32,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub craft: Option<CraftDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CraftDto {
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
}

impl From<ItemDto> for Item {
    fn from(dto: ItemDto) -> Self {
        let craft = dto.craft.and_then(|craft| {
            Some(Craft {
                skill: craft.skill?.parse().ok()?,
                level: craft.level.unwrap_or(1),
            })
        });
        Item {
            code: dto.code,
            name: dto.name,
            level: dto.level,
            kind: dto.kind,
            subtype: dto.subtype,
            craft,
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Common shape of every action answer; `detail` holds the action specific
/// fields next to `cooldown` and `character`.
#[derive(Debug, Deserialize)]
pub(crate) struct ActionDto<D> {
    pub cooldown: CooldownDto,
    pub character: CharacterDto,
    #[serde(flatten)]
    pub detail: D,
}

impl<D> ActionDto<D> {
    pub fn into_response<T>(self, convert: impl FnOnce(D) -> T) -> ActionResponse<T> {
        ActionResponse {
            character: self.character.into(),
            cooldown: self.cooldown.into(),
            detail: convert(self.detail),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoveDetail {
    pub destination: MapDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GatherDetail {
    pub details: SkillInfoDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SkillInfoDto {
    pub items: Vec<SimpleItemDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FightDetail {
    pub fight: FightDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FightDto {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub turns: u32,
    #[serde(default)]
    pub drops: Vec<SimpleItemDto>,
    pub result: FightResultDto,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FightResultDto {
    Win,
    #[serde(alias = "lose")]
    Loss,
}

impl From<FightDto> for FightSummary {
    fn from(dto: FightDto) -> Self {
        FightSummary {
            result: match dto.result {
                FightResultDto::Win => FightResult::Win,
                FightResultDto::Loss => FightResult::Loss,
            },
            turns: dto.turns,
            xp: dto.xp,
            gold: dto.gold,
            drops: dto.drops.into_iter().map(ItemStack::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BankItemsDetail {
    pub bank: Vec<SimpleItemDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BankGoldDetail {
    pub bank: GoldDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoldDto {
    pub quantity: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskDetail {
    pub task: TaskDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TaskDto {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub total: u32,
}

impl From<TaskDto> for Task {
    fn from(dto: TaskDto) -> Self {
        Task::new(dto.code, TaskKind::from(dto.kind.as_str()), 0, dto.total)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RewardDetail {
    pub reward: SimpleItemDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHARACTER: &str = r#"{
        "name": "ada", "skin": "women1", "level": 4, "xp": 120, "gold": 35,
        "hp": 140, "max_hp": 140, "x": 2, "y": -1,
        "mining_level": 3, "woodcutting_level": 1, "fishing_level": 2,
        "attack_fire": 0, "attack_earth": 12, "attack_water": 0, "attack_air": 0,
        "dmg_earth": 10, "res_water": 5,
        "cooldown": 7, "cooldown_expiration": "2024-05-01T10:00:00Z",
        "task": "chicken", "task_type": "monsters", "task_progress": 2, "task_total": 9,
        "inventory_max_items": 100,
        "inventory": [
            {"slot": 1, "code": "copper_ore", "quantity": 4},
            {"slot": 2, "code": "", "quantity": 0}
        ]
    }"#;

    #[test]
    fn character_schema_decodes_into_status() {
        let dto: CharacterDto = serde_json::from_str(CHARACTER).unwrap();
        let status = CharacterStatus::from(dto);

        assert_eq!(status.position, Position::new(2, -1));
        assert_eq!(status.skill_level(Skill::Mining), 3);
        assert_eq!(status.attack, ElementStats::new(0, 0, 12, 0));
        assert_eq!(status.damage_bonus, ElementStats::new(0, 0, 10, 0));
        assert_eq!(status.resistance, ElementStats::new(0, 5, 0, 0));
        assert_eq!(status.inventory, vec![ItemStack::new("copper_ore", 4)]);
        assert_eq!(
            status.task,
            Some(Task::new("chicken", TaskKind::Monsters, 2, 9))
        );
        assert_eq!(status.cooldown_seconds, 7);
    }

    #[test]
    fn empty_task_code_means_no_task() {
        let dto: CharacterDto =
            serde_json::from_str(r#"{"name": "bob", "task": "", "task_type": ""}"#).unwrap();
        assert_eq!(CharacterStatus::from(dto).task, None);
    }

    #[test]
    fn map_content_decodes_to_closed_kinds() {
        let rows: Vec<MapDto> = serde_json::from_str(
            r#"[
                {"name": "Forest", "skin": "forest_1", "x": 0, "y": 1,
                 "content": {"type": "resource", "code": "ash_tree"}},
                {"name": "City", "skin": "city", "x": 4, "y": 1,
                 "content": {"type": "tasks_master", "code": "monsters"}},
                {"name": "Plain", "skin": "plain", "x": 5, "y": 5, "content": null},
                {"name": "Camp", "skin": "camp", "x": 6, "y": 5,
                 "content": {"type": "npc", "code": "trader"}}
            ]"#,
        )
        .unwrap();
        let tiles: Vec<MapTile> = rows.into_iter().map(MapTile::from).collect();

        assert_eq!(tiles[0], MapTile::new(0, 1, ContentKind::Resource, "ash_tree"));
        assert_eq!(tiles[1].kind, ContentKind::TasksMaster);
        assert_eq!(tiles[2], MapTile::empty(5, 5));
        assert_eq!(tiles[3], MapTile::empty(6, 5));
    }

    #[test]
    fn page_metadata_falls_back_to_request() {
        let dto: PageDto<SimpleItemDto> = serde_json::from_str(
            r#"{"data": [{"code": "ash_wood", "quantity": 3}], "total": 1, "page": null, "size": 100, "pages": null}"#,
        )
        .unwrap();
        let page = dto.into_page(2, |item| Some(ItemStack::from(item)));

        assert_eq!(page.page, 2);
        assert!(page.is_last());
        assert_eq!(page.data, vec![ItemStack::new("ash_wood", 3)]);
    }

    #[test]
    fn resources_with_unknown_skill_are_dropped() {
        let rows: Vec<ResourceDto> = serde_json::from_str(
            r#"[
                {"name": "Copper Rocks", "code": "copper_rocks", "skill": "mining", "level": 1,
                 "drops": [{"code": "copper_ore", "rate": 1, "min_quantity": 1, "max_quantity": 1}]},
                {"name": "Sunflower", "code": "sunflower_field", "skill": "alchemy", "level": 1, "drops": []}
            ]"#,
        )
        .unwrap();
        let resources: Vec<Resource> = rows.into_iter().filter_map(ResourceDto::into_resource).collect();

        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].skill, Skill::Mining);
        assert!(resources[0].drops_item("copper_ore"));
    }

    #[test]
    fn monster_stats_decode_per_element() {
        let dto: MonsterDto = serde_json::from_str(
            r#"{"name": "Chicken", "code": "chicken", "level": 1, "hp": 60,
                "attack_fire": 0, "attack_earth": 0, "attack_water": 4, "attack_air": 0,
                "res_fire": 0, "res_earth": 0, "res_water": 0, "res_air": 0,
                "min_gold": 0, "max_gold": 3,
                "drops": [{"code": "feather", "rate": 8, "min_quantity": 1, "max_quantity": 1}]}"#,
        )
        .unwrap();
        let monster = Monster::from(dto);

        assert_eq!(monster.attack.water, 4);
        assert_eq!(monster.max_gold, 3);
        assert_eq!(monster.drops[0].code, "feather");
    }

    #[test]
    fn fight_action_decodes_detail_next_to_character() {
        let body = format!(
            r#"{{"data": {{
                "cooldown": {{"total_seconds": 9, "remaining_seconds": 9, "reason": "fight"}},
                "fight": {{"xp": 12, "gold": 2, "drops": [{{"code": "feather", "quantity": 1}}],
                          "turns": 4, "result": "win"}},
                "character": {CHARACTER}
            }}}}"#
        );
        let envelope: Envelope<ActionDto<FightDetail>> = serde_json::from_str(&body).unwrap();
        let response = envelope.data.into_response(|detail| FightSummary::from(detail.fight));

        assert_eq!(response.cooldown, Cooldown::seconds(9));
        assert!(response.detail.is_win());
        assert_eq!(response.detail.drops, vec![ItemStack::new("feather", 1)]);
        assert_eq!(response.character.name, "ada");
    }

    #[test]
    fn craftable_items_keep_their_skill() {
        let items: Vec<ItemDto> = serde_json::from_str(
            r#"[
                {"name": "Copper Dagger", "code": "copper_dagger", "level": 1, "type": "weapon",
                 "subtype": "", "craft": {"skill": "weaponcrafting", "level": 1,
                 "items": [{"code": "copper", "quantity": 6}], "quantity": 1}},
                {"name": "Feather", "code": "feather", "level": 1, "type": "resource",
                 "subtype": "mob", "craft": null}
            ]"#,
        )
        .unwrap();
        let items: Vec<Item> = items.into_iter().map(Item::from).collect();

        assert!(items[0].is_craftable());
        assert_eq!(items[0].kind, "weapon");
        assert!(!items[1].is_craftable());
    }
}
