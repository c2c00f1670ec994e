//! Loading and refreshing the world tables from the game server.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use game_core::{BankSnapshot, BankUpdate};

use super::{WorldError, WorldIndex};
use crate::api::{ApiResult, GameApi, Page};

/// Listing a refresh failed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WorldTable {
    Tiles,
    Monsters,
    Resources,
    Items,
    BankItems,
    BankGold,
}

/// Walks a paginated listing from page 1 until the last page.
async fn fetch_all<T, F, Fut>(table: WorldTable, mut fetch: F) -> Result<Vec<T>, WorldError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ApiResult<Page<T>>>,
{
    let mut rows = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch(page)
            .await
            .map_err(|source| WorldError::Fetch {
                table,
                page,
                source,
            })?;
        let last = batch.is_last();
        rows.extend(batch.data);
        if last {
            return Ok(rows);
        }
        page += 1;
    }
}

impl WorldIndex {
    /// Re-fetches every map page and swaps the tile table.
    pub async fn refresh_tiles(&self, api: &dyn GameApi) -> Result<usize, WorldError> {
        let tiles = fetch_all(WorldTable::Tiles, move |page| api.map_tiles(page)).await?;
        let count = tiles.len();
        self.replace_tiles(tiles);
        Ok(count)
    }

    /// Re-fetches the monster, resource and item catalogs.
    ///
    /// All three listings are fetched before any table is replaced.
    pub async fn refresh_catalogs(&self, api: &dyn GameApi) -> Result<(), WorldError> {
        let monsters = fetch_all(WorldTable::Monsters, move |page| api.monsters(page)).await?;
        let resources = fetch_all(WorldTable::Resources, move |page| api.resources(page)).await?;
        let items = fetch_all(WorldTable::Items, move |page| api.items(page)).await?;
        debug!(
            target: "runtime::world",
            monsters = monsters.len(),
            resources = resources.len(),
            items = items.len(),
            "catalogs fetched"
        );
        self.replace_catalogs(monsters, resources, items);
        Ok(())
    }

    /// Re-fetches the bank item list and gold total.
    pub async fn refresh_bank(&self, api: &dyn GameApi) -> Result<(), WorldError> {
        let items = fetch_all(WorldTable::BankItems, move |page| api.bank_items(page)).await?;
        let gold = api.bank_gold().await.map_err(|source| WorldError::Fetch {
            table: WorldTable::BankGold,
            page: 1,
            source,
        })?;
        self.replace_bank(BankSnapshot { gold, items });
        Ok(())
    }

    /// Initial load of every table.
    pub async fn load_all(&self, api: &dyn GameApi) -> Result<(), WorldError> {
        let tiles = self.refresh_tiles(api).await?;
        self.refresh_catalogs(api).await?;
        self.refresh_bank(api).await?;
        info!(
            target: "runtime::world",
            tiles,
            items = self.item_count(),
            "world loaded"
        );
        Ok(())
    }
}

/// Background task keeping a [`WorldIndex`] current.
///
/// Refreshes the map every `map_interval` and, when configured, the catalogs
/// every `catalog_interval`. Bank updates pushed by characters are applied as
/// they arrive. A failed refresh is reported on `error_tx` and the previous
/// tables stay in place. Cancellation abandons a refresh between pages; the
/// tables are only swapped once every page has arrived.
pub struct WorldRefresher {
    api: Arc<dyn GameApi>,
    index: WorldIndex,
    bank_rx: mpsc::Receiver<BankUpdate>,
    error_tx: mpsc::Sender<WorldError>,
    cancel: CancellationToken,
    map_interval: Duration,
    catalog_interval: Option<Duration>,
}

fn delayed_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl WorldRefresher {
    pub fn new(
        api: Arc<dyn GameApi>,
        index: WorldIndex,
        bank_rx: mpsc::Receiver<BankUpdate>,
        error_tx: mpsc::Sender<WorldError>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            index,
            bank_rx,
            error_tx,
            cancel,
            map_interval: Duration::from_secs(2),
            catalog_interval: None,
        }
    }

    pub fn with_map_interval(mut self, interval: Duration) -> Self {
        self.map_interval = interval;
        self
    }

    pub fn with_catalog_interval(mut self, interval: Option<Duration>) -> Self {
        self.catalog_interval = interval;
        self
    }

    /// Main worker loop
    pub async fn run(mut self) {
        debug!(target: "runtime::world", interval = ?self.map_interval, "world refresher started");

        let mut map_tick = delayed_interval(self.map_interval);
        let catalogs_enabled = self.catalog_interval.is_some();
        let mut catalog_tick =
            delayed_interval(self.catalog_interval.unwrap_or(Duration::from_secs(3600)));
        let mut bank_open = true;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                _ = map_tick.tick() => {
                    let refreshed = tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        result = self.index.refresh_tiles(self.api.as_ref()) => result,
                    };
                    match refreshed {
                        Ok(count) => debug!(target: "runtime::world", tiles = count, "map refreshed"),
                        Err(error) => {
                            if !self.report(error).await {
                                break;
                            }
                        }
                    }
                }

                _ = catalog_tick.tick(), if catalogs_enabled => {
                    let refreshed = tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        result = self.index.refresh_catalogs(self.api.as_ref()) => result,
                    };
                    if let Err(error) = refreshed {
                        if !self.report(error).await {
                            break;
                        }
                    }
                }

                update = self.bank_rx.recv(), if bank_open => {
                    match update {
                        Some(update) => self.index.apply_bank_update(update),
                        None => bank_open = false,
                    }
                }
            }
        }

        debug!(target: "runtime::world", "world refresher stopped");
    }

    /// Forwards a refresh failure to the supervisor.
    ///
    /// Returns `false` when nobody is listening any more.
    async fn report(&self, error: WorldError) -> bool {
        error!(target: "runtime::world", error = %error, "world refresh failed");
        self.error_tx.send(error).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use game_core::{ContentKind, ItemStack, MapTile};

    use super::*;
    use crate::api::{ApiError, MockCall, MockGameApi};

    fn api() -> MockGameApi {
        MockGameApi::new()
            .with_page_size(2)
            .with_tiles(vec![
                MapTile::new(0, 0, ContentKind::None, ""),
                MapTile::new(1, 0, ContentKind::Bank, "bank"),
                MapTile::new(2, 0, ContentKind::Resource, "copper_rocks"),
                MapTile::new(3, 0, ContentKind::Monster, "chicken"),
                MapTile::new(4, 0, ContentKind::TasksMaster, "monsters"),
            ])
            .with_bank(BankSnapshot {
                gold: 12,
                items: vec![ItemStack::new("feather", 3)],
            })
    }

    #[tokio::test]
    async fn load_all_walks_every_page() {
        let api = api();
        let world = WorldIndex::new();

        world.load_all(&api).await.unwrap();

        assert_eq!(world.tile_count(), 5);
        assert_eq!(api.count(MockCall::MapTiles), 3);
        assert_eq!(world.bank().gold, 12);
        assert_eq!(world.bank().quantity_of("feather"), 3);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_tiles() {
        let api = api();
        let world = WorldIndex::new();
        world.load_all(&api).await.unwrap();

        api.set_tiles(Vec::new());
        api.fail_next(MockCall::MapTiles, ApiError::Transport("timeout".into()));
        let error = world.refresh_tiles(&api).await.unwrap_err();

        assert!(matches!(
            error,
            WorldError::Fetch {
                table: WorldTable::Tiles,
                page: 1,
                ..
            }
        ));
        assert_eq!(world.tile_count(), 5);
    }

    #[tokio::test]
    async fn refresher_applies_bank_updates_and_reports_errors() {
        let api = api();
        let world = WorldIndex::new();
        world.load_all(&api).await.unwrap();
        api.fail_next(MockCall::MapTiles, ApiError::Transport("timeout".into()));

        let (bank_tx, bank_rx) = mpsc::channel(4);
        let (error_tx, mut error_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let refresher = WorldRefresher::new(
            Arc::new(api.clone()),
            world.clone(),
            bank_rx,
            error_tx,
            cancel.clone(),
        )
        .with_map_interval(Duration::from_millis(10));
        let task = tokio::spawn(refresher.run());

        bank_tx.send(BankUpdate::gold(99)).await.unwrap();
        let error = error_rx.recv().await.unwrap();
        assert!(matches!(error, WorldError::Fetch { table: WorldTable::Tiles, .. }));

        time::timeout(Duration::from_secs(5), async {
            while world.bank().gold != 99 {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("bank update applied");

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(world.tile_count(), 5);
    }

    #[tokio::test]
    async fn cancellation_abandons_refresh_between_pages() {
        let api = MockGameApi::new()
            .with_page_size(1)
            .with_latency(MockCall::MapTiles, Duration::from_millis(300))
            .with_tiles(vec![
                MapTile::new(0, 0, ContentKind::None, ""),
                MapTile::new(1, 0, ContentKind::Bank, "bank"),
                MapTile::new(2, 0, ContentKind::Resource, "ash_tree"),
                MapTile::new(3, 0, ContentKind::Monster, "chicken"),
            ]);
        let world = WorldIndex::new();

        let (_bank_tx, bank_rx) = mpsc::channel(4);
        let (error_tx, _error_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let refresher = WorldRefresher::new(
            Arc::new(api.clone()),
            world.clone(),
            bank_rx,
            error_tx,
            cancel.clone(),
        )
        .with_map_interval(Duration::from_millis(10));
        let task = tokio::spawn(refresher.run());

        time::timeout(Duration::from_secs(5), async {
            while api.count(MockCall::MapTiles) == 0 {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first page requested");
        cancel.cancel();

        time::timeout(Duration::from_secs(1), task)
            .await
            .expect("refresher stops promptly")
            .unwrap();
        assert_eq!(api.count(MockCall::MapTiles), 1);
        assert_eq!(world.tile_count(), 0);
    }
}
