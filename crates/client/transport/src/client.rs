//! HTTP implementation of [`GameApi`].
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use game_core::{CharacterStatus, Item, ItemStack, MapTile, Monster, Position, Resource, Task};
use runtime::{ActionResponse, ApiResult, FightSummary, GameApi, Page, StatusCode};

use crate::dto::{
    ActionDto, BankGoldDetail, BankItemsDetail, CharacterDto, Envelope, ErrorEnvelope,
    FightDetail, GatherDetail, GoldDto, ItemDto, MapDto, MonsterDto, MoveDetail, PageDto,
    ResourceDto, RewardDetail, SimpleItemDto, TaskDetail,
};
use crate::error::{HttpError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.artifactsmmo.com";

/// Connection settings for [`HttpGameApi`].
#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub base_url: String,
    pub token: String,
    /// Extra attempts after the first for retryable failures.
    pub max_retries: u32,
    /// Backoff unit; retry `n` waits `n * retry_delay`.
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub page_size: u32,
}

impl HttpConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            page_size: 100,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

/// Game server client speaking JSON over HTTPS with a bearer token.
///
/// Retryable statuses (461, 486, 499, 5xx), connection failures and timeouts
/// are retried with linear backoff up to [`HttpConfig::max_retries`]; every
/// other failure is handed to the caller as is. Once the cancellation token
/// fires, pending requests and backoff pauses end with
/// [`HttpError::Cancelled`].
pub struct HttpGameApi {
    http: reqwest::Client,
    config: HttpConfig,
    cancel: CancellationToken,
}

impl HttpGameApi {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(config, http))
    }

    /// Uses a preconfigured client (proxy, TLS roots). `request_timeout` is
    /// left to that client.
    pub fn with_client(config: HttpConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops requests and retries once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Sends a request and decodes the whole success body as `B`.
    async fn send<B: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<B> {
        let mut attempt = 0;
        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Err(HttpError::Cancelled),
                result = self.send_once(method.clone(), path, body) => result,
            };
            match result {
                Ok(decoded) => return Ok(decoded),
                Err(error) if error.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_delay * attempt;
                    warn!(
                        target: "client::http",
                        %method,
                        path,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying request"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(HttpError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send_once<B: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<B> {
        let mut request = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        debug!(
            target: "client::http",
            path,
            status = status.as_u16(),
            len = bytes.len(),
            "response"
        );

        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        Err(HttpError::Status {
            code: StatusCode(status.as_u16()),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let envelope: Envelope<T> = self.send(Method::GET, path, None).await?;
        Ok(envelope.data)
    }

    async fn action<D: DeserializeOwned>(
        &self,
        name: &str,
        action: &str,
        body: Option<Value>,
    ) -> Result<ActionDto<D>> {
        let path = format!("/my/{name}/action/{action}");
        let envelope: Envelope<ActionDto<D>> =
            self.send(Method::POST, &path, body.as_ref()).await?;
        Ok(envelope.data)
    }

    /// Fetches one page of a listing; pagination fields sit next to `data`.
    async fn page<D, T>(
        &self,
        path: &str,
        page: u32,
        convert: impl FnMut(D) -> Option<T>,
    ) -> Result<Page<T>>
    where
        D: DeserializeOwned,
    {
        let path = format!("{path}?page={page}&size={}", self.config.page_size);
        let dto: PageDto<D> = self.send(Method::GET, &path, None).await?;
        Ok(dto.into_page(page, convert))
    }
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn character(&self, name: &str) -> ApiResult<CharacterStatus> {
        let dto: CharacterDto = self.get(&format!("/characters/{name}")).await?;
        Ok(dto.into())
    }

    async fn create_character(&self, name: &str, skin: &str) -> ApiResult<CharacterStatus> {
        let body = json!({ "name": name, "skin": skin });
        let envelope: Envelope<CharacterDto> = self
            .send(Method::POST, "/characters/create", Some(&body))
            .await?;
        Ok(envelope.data.into())
    }

    async fn move_to(&self, name: &str, position: Position) -> ApiResult<ActionResponse<MapTile>> {
        let body = json!({ "x": position.x, "y": position.y });
        let dto: ActionDto<MoveDetail> = self.action(name, "move", Some(body)).await?;
        Ok(dto.into_response(|detail| MapTile::from(detail.destination)))
    }

    async fn gather(&self, name: &str) -> ApiResult<ActionResponse<Vec<ItemStack>>> {
        let dto: ActionDto<GatherDetail> = self.action(name, "gathering", None).await?;
        Ok(dto.into_response(|detail| {
            detail.details.items.into_iter().map(ItemStack::from).collect()
        }))
    }

    async fn fight(&self, name: &str) -> ApiResult<ActionResponse<FightSummary>> {
        let dto: ActionDto<FightDetail> = self.action(name, "fight", None).await?;
        Ok(dto.into_response(|detail| FightSummary::from(detail.fight)))
    }

    async fn deposit_item(
        &self,
        name: &str,
        code: &str,
        quantity: u32,
    ) -> ApiResult<ActionResponse<Vec<ItemStack>>> {
        let body = json!({ "code": code, "quantity": quantity });
        let dto: ActionDto<BankItemsDetail> =
            self.action(name, "bank/deposit", Some(body)).await?;
        Ok(dto.into_response(|detail| detail.bank.into_iter().map(ItemStack::from).collect()))
    }

    async fn deposit_gold(&self, name: &str, quantity: u64) -> ApiResult<ActionResponse<u64>> {
        let body = json!({ "quantity": quantity });
        let dto: ActionDto<BankGoldDetail> =
            self.action(name, "bank/deposit/gold", Some(body)).await?;
        Ok(dto.into_response(|detail| detail.bank.quantity))
    }

    async fn accept_task(&self, name: &str) -> ApiResult<ActionResponse<Task>> {
        let dto: ActionDto<TaskDetail> = self.action(name, "task/new", None).await?;
        Ok(dto.into_response(|detail| Task::from(detail.task)))
    }

    async fn complete_task(&self, name: &str) -> ApiResult<ActionResponse<ItemStack>> {
        let dto: ActionDto<RewardDetail> = self.action(name, "task/complete", None).await?;
        Ok(dto.into_response(|detail| ItemStack::from(detail.reward)))
    }

    async fn exchange_task_coins(&self, name: &str) -> ApiResult<ActionResponse<ItemStack>> {
        let dto: ActionDto<RewardDetail> = self.action(name, "task/exchange", None).await?;
        Ok(dto.into_response(|detail| ItemStack::from(detail.reward)))
    }

    async fn map_tiles(&self, page: u32) -> ApiResult<Page<MapTile>> {
        Ok(self
            .page("/maps", page, |dto: MapDto| Some(MapTile::from(dto)))
            .await?)
    }

    async fn monsters(&self, page: u32) -> ApiResult<Page<Monster>> {
        Ok(self
            .page("/monsters", page, |dto: MonsterDto| Some(Monster::from(dto)))
            .await?)
    }

    async fn resources(&self, page: u32) -> ApiResult<Page<Resource>> {
        Ok(self
            .page("/resources", page, ResourceDto::into_resource)
            .await?)
    }

    async fn items(&self, page: u32) -> ApiResult<Page<Item>> {
        Ok(self
            .page("/items", page, |dto: ItemDto| Some(Item::from(dto)))
            .await?)
    }

    async fn bank_items(&self, page: u32) -> ApiResult<Page<ItemStack>> {
        Ok(self
            .page("/my/bank/items", page, |dto: SimpleItemDto| {
                Some(ItemStack::from(dto))
            })
            .await?)
    }

    async fn bank_gold(&self) -> ApiResult<u64> {
        let gold: GoldDto = self.get("/my/bank/gold").await?;
        Ok(gold.quantity)
    }
}
