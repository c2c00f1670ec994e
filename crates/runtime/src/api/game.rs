//! Abstraction over the remote game server.
//!
//! [`GameApi`] is the only seam between the runtime and the network. The HTTP
//! client lives in the `client-transport` crate and [`crate::api::mock`]
//! provides an in-memory server for tests. Both decode server payloads into
//! `game-core` types before handing them over.
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use game_core::{CharacterStatus, Item, ItemStack, MapTile, Monster, Position, Resource, Task};

use super::status::StatusCode;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure of a single game server call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("server rejected request with status {code}: {message}")]
    Rejected { code: StatusCode, message: String },

    /// The request never produced a usable answer (network, timeout, retries exhausted).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered but the payload could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn rejected(code: StatusCode) -> Self {
        Self::Rejected {
            code,
            message: String::new(),
        }
    }

    /// Status code carried by a rejection, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Cooldown imposed by the server after an action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cooldown {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
}

impl Cooldown {
    pub const fn seconds(remaining_seconds: u32) -> Self {
        Self {
            total_seconds: remaining_seconds,
            remaining_seconds,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.remaining_seconds))
    }
}

/// Successful action answer: the refreshed character, its cooldown and the
/// action specific payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionResponse<T> {
    pub character: CharacterStatus,
    pub cooldown: Cooldown,
    pub detail: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FightResult {
    Win,
    Loss,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FightSummary {
    pub result: FightResult,
    pub turns: u32,
    pub xp: u32,
    pub gold: u32,
    pub drops: Vec<ItemStack>,
}

impl FightSummary {
    pub fn is_win(&self) -> bool {
        self.result == FightResult::Win
    }
}

/// One page of a paginated listing. Pages are 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub pages: u32,
}

impl<T> Page<T> {
    pub fn single(data: Vec<T>) -> Self {
        Self {
            data,
            page: 1,
            pages: 1,
        }
    }

    /// An empty page also ends iteration so a server miscounting `pages`
    /// cannot stall a refresh.
    pub fn is_last(&self) -> bool {
        self.page >= self.pages || self.data.is_empty()
    }
}

/// Remote game server operations used by the agent.
///
/// Character actions reply with an [`ActionResponse`]; a non-success status
/// surfaces as [`ApiError::Rejected`]. Implementations are expected to retry
/// transient conditions ([`StatusCode::is_retryable`]) themselves.
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn character(&self, name: &str) -> ApiResult<CharacterStatus>;

    async fn create_character(&self, name: &str, skin: &str) -> ApiResult<CharacterStatus>;

    async fn move_to(&self, name: &str, position: Position) -> ApiResult<ActionResponse<MapTile>>;

    /// Gathers once on the current tile, returning the items obtained.
    async fn gather(&self, name: &str) -> ApiResult<ActionResponse<Vec<ItemStack>>>;

    async fn fight(&self, name: &str) -> ApiResult<ActionResponse<FightSummary>>;

    /// Deposits one stack, returning the full bank item list afterwards.
    async fn deposit_item(
        &self,
        name: &str,
        code: &str,
        quantity: u32,
    ) -> ApiResult<ActionResponse<Vec<ItemStack>>>;

    /// Deposits gold, returning the bank gold total afterwards.
    async fn deposit_gold(&self, name: &str, quantity: u64) -> ApiResult<ActionResponse<u64>>;

    async fn accept_task(&self, name: &str) -> ApiResult<ActionResponse<Task>>;

    /// Hands in a finished task, returning the reward.
    async fn complete_task(&self, name: &str) -> ApiResult<ActionResponse<ItemStack>>;

    /// Trades task coins at the task master, returning the reward.
    async fn exchange_task_coins(&self, name: &str) -> ApiResult<ActionResponse<ItemStack>>;

    async fn map_tiles(&self, page: u32) -> ApiResult<Page<MapTile>>;

    async fn monsters(&self, page: u32) -> ApiResult<Page<Monster>>;

    async fn resources(&self, page: u32) -> ApiResult<Page<Resource>>;

    async fn items(&self, page: u32) -> ApiResult<Page<Item>>;

    async fn bank_items(&self, page: u32) -> ApiResult<Page<ItemStack>>;

    async fn bank_gold(&self) -> ApiResult<u64>;
}
