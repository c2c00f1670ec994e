//! Per-character actor.
//!
//! The actor is the only component issuing game actions for its character.
//! It owns the cached [`CharacterStatus`], publishes a copy after every
//! change, and sleeps out the server cooldown after each successful action.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use game_core::{BankUpdate, CharacterStatus, Position};

use crate::api::{
    ActionResponse, ActorError, ApiError, ApiResult, CharacterHandle, FightResult, GameApi, Report,
};
use crate::command::{ActionOutcome, Command, CommandError, StepContext, StepError, StepResult};

/// Skins picked from when the character has to be created.
const SKINS: [&str; 6] = ["men1", "men2", "men3", "women1", "women2", "women3"];

pub struct CharacterActor {
    name: String,
    api: Arc<dyn GameApi>,
    status: CharacterStatus,
    status_tx: watch::Sender<CharacterStatus>,
    command_rx: mpsc::Receiver<Command>,
    report_tx: mpsc::Sender<Report>,
    bank_tx: mpsc::Sender<BankUpdate>,
    cancel: CancellationToken,
}

impl CharacterActor {
    /// Creates the actor and the handle used to drive it.
    pub fn new(
        name: impl Into<String>,
        api: Arc<dyn GameApi>,
        report_tx: mpsc::Sender<Report>,
        bank_tx: mpsc::Sender<BankUpdate>,
        cancel: CancellationToken,
        command_buffer: usize,
    ) -> (Self, CharacterHandle) {
        let name = name.into();
        let status = CharacterStatus::new(name.clone());
        let (status_tx, status_rx) = watch::channel(status.clone());
        let (command_tx, command_rx) = mpsc::channel(command_buffer.max(1));

        let actor = Self {
            name: name.clone(),
            api,
            status,
            status_tx,
            command_rx,
            report_tx,
            bank_tx,
            cancel,
        };
        (actor, CharacterHandle::new(name, command_tx, status_rx))
    }

    /// Main worker loop
    pub async fn run(mut self) {
        let started = match self.start().await {
            Ok(()) => Report::started(&self.name),
            Err(StepError::Cancelled) => return,
            Err(error) => {
                let source = match error {
                    StepError::Api(source) => source,
                    other => ApiError::Transport(other.to_string()),
                };
                let error = ActorError::Startup {
                    character: self.name.clone(),
                    source,
                };
                Report::failed(&self.name, None, error)
            }
        };
        let failed_start = started.error.is_some();
        if self.report_tx.send(started).await.is_err() || failed_start {
            return;
        }

        loop {
            let command = tokio::select! {
                _ = self.cancel.cancelled() => break,
                command = self.command_rx.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            debug!(target: "runtime::character", character = %self.name, %command, "executing");
            let report = match command.execute(&mut self).await {
                Ok(outcome) => Report::status(&self.name, outcome.code, outcome.step),
                Err(error) if error.is_cancelled() => break,
                Err(error) => self.failure_report(error),
            };

            if self.report_tx.send(report).await.is_err() {
                break;
            }
        }

        debug!(target: "runtime::character", character = %self.name, "actor stopped");
    }

    fn failure_report(&self, error: CommandError) -> Report {
        let CommandError { step, source, .. } = error;
        let error = match source {
            StepError::Invalid { reason, .. } => ActorError::InvalidStep {
                character: self.name.clone(),
                step,
                reason,
            },
            StepError::Api(source) => ActorError::Api {
                character: self.name.clone(),
                step,
                source,
            },
            StepError::Cancelled => ActorError::Api {
                character: self.name.clone(),
                step,
                source: ApiError::Transport("cancelled".into()),
            },
        };
        warn!(target: "runtime::character", character = %self.name, error = %error, "command aborted");
        Report::failed(&self.name, Some(step), error)
    }

    /// Fetches (or creates) the character and waits out any pending cooldown.
    async fn start(&mut self) -> StepResult<()> {
        let status = match self.api.character(&self.name).await {
            Ok(status) => status,
            Err(ApiError::Rejected { code, .. }) if code.is_missing_character() => {
                let skin = SKINS.choose(&mut rand::thread_rng()).copied().unwrap_or(SKINS[0]);
                info!(target: "runtime::character", character = %self.name, skin, "creating character");
                self.api.create_character(&self.name, skin).await?
            }
            Err(error) => return Err(error.into()),
        };

        let pending = Duration::from_secs(u64::from(status.cooldown_seconds));
        self.publish(status);
        info!(
            target: "runtime::character",
            character = %self.name,
            position = %self.status.position,
            "character ready"
        );
        self.wait(pending).await
    }

    fn publish(&mut self, status: CharacterStatus) {
        self.status = status;
        self.status_tx.send_replace(self.status.clone());
    }

    /// Sleeps for `duration` unless cancelled first.
    async fn wait(&self, duration: Duration) -> StepResult<()> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(StepError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Common tail of every action: refresh the status, then honour the
    /// cooldown. Rejections are turned into an outcome for the step.
    async fn settle<T>(
        &mut self,
        response: ApiResult<ActionResponse<T>>,
    ) -> StepResult<Result<T, ActionOutcome>> {
        match response {
            Ok(ActionResponse {
                character,
                cooldown,
                detail,
            }) => {
                self.publish(character);
                self.wait(cooldown.duration()).await?;
                Ok(Ok(detail))
            }
            Err(ApiError::Rejected { code, message }) => {
                debug!(
                    target: "runtime::character",
                    character = %self.name,
                    %code,
                    reason = %message,
                    "action rejected"
                );
                Ok(Err(ActionOutcome::Rejected(code)))
            }
            Err(error) => Err(error.into()),
        }
    }

    fn ensure_running(&self) -> StepResult<()> {
        if self.cancel.is_cancelled() {
            return Err(StepError::Cancelled);
        }
        Ok(())
    }

    async fn push_bank_update(&self, update: BankUpdate) {
        if self.bank_tx.send(update).await.is_err() {
            debug!(target: "runtime::character", character = %self.name, "bank update dropped");
        }
    }
}

#[async_trait]
impl StepContext for CharacterActor {
    fn status(&self) -> &CharacterStatus {
        &self.status
    }

    async fn move_to(&mut self, target: Position) -> StepResult<ActionOutcome> {
        if self.status.position == target {
            return Ok(ActionOutcome::Done);
        }
        self.ensure_running()?;
        let response = self.api.move_to(&self.name, target).await;
        Ok(match self.settle(response).await? {
            Ok(_) => ActionOutcome::Done,
            Err(rejected) => rejected,
        })
    }

    async fn gather(&mut self) -> StepResult<ActionOutcome> {
        self.ensure_running()?;
        let response = self.api.gather(&self.name).await;
        Ok(match self.settle(response).await? {
            Ok(_) => ActionOutcome::Done,
            Err(rejected) => rejected,
        })
    }

    async fn fight(&mut self) -> StepResult<ActionOutcome> {
        self.ensure_running()?;
        let response = self.api.fight(&self.name).await;
        Ok(match self.settle(response).await? {
            Ok(summary) if summary.result == FightResult::Win => ActionOutcome::Won,
            Ok(_) => {
                info!(target: "runtime::character", character = %self.name, "fight lost");
                ActionOutcome::Lost
            }
            Err(rejected) => rejected,
        })
    }

    /// One deposit call per carried stack not named in `keep`, then one for
    /// the carried gold.
    async fn deposit_all(&mut self, keep: &[String]) -> StepResult<ActionOutcome> {
        let stacks: Vec<_> = self
            .status
            .carried_items()
            .filter(|stack| !keep.contains(&stack.code))
            .cloned()
            .collect();
        for stack in stacks {
            self.ensure_running()?;
            let response = self
                .api
                .deposit_item(&self.name, &stack.code, stack.quantity)
                .await;
            match self.settle(response).await? {
                Ok(bank_items) => self.push_bank_update(BankUpdate::items(bank_items)).await,
                Err(rejected) => return Ok(rejected),
            }
        }

        let gold = self.status.gold;
        if gold > 0 {
            self.ensure_running()?;
            let response = self.api.deposit_gold(&self.name, gold).await;
            match self.settle(response).await? {
                Ok(bank_gold) => self.push_bank_update(BankUpdate::gold(bank_gold)).await,
                Err(rejected) => return Ok(rejected),
            }
        }

        Ok(ActionOutcome::Done)
    }

    async fn accept_task(&mut self) -> StepResult<ActionOutcome> {
        self.ensure_running()?;
        let response = self.api.accept_task(&self.name).await;
        Ok(match self.settle(response).await? {
            Ok(task) => {
                info!(
                    target: "runtime::character",
                    character = %self.name,
                    task = %task.code,
                    kind = %task.kind,
                    total = task.total,
                    "task accepted"
                );
                ActionOutcome::Done
            }
            Err(rejected) => rejected,
        })
    }

    async fn complete_task(&mut self) -> StepResult<ActionOutcome> {
        self.ensure_running()?;
        let response = self.api.complete_task(&self.name).await;
        Ok(match self.settle(response).await? {
            Ok(reward) => {
                info!(
                    target: "runtime::character",
                    character = %self.name,
                    reward = %reward.code,
                    quantity = reward.quantity,
                    "task completed"
                );
                ActionOutcome::Done
            }
            Err(rejected) => rejected,
        })
    }

    async fn exchange_task_coins(&mut self) -> StepResult<ActionOutcome> {
        self.ensure_running()?;
        let response = self.api.exchange_task_coins(&self.name).await;
        Ok(match self.settle(response).await? {
            Ok(_) => ActionOutcome::Done,
            Err(rejected) => rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use game_core::{ContentKind, ItemStack, MapTile, Skill};

    use super::*;
    use crate::api::{MockCall, MockGameApi, ReportCode, StatusCode};
    use crate::command::{Site, Step};

    struct Harness {
        api: MockGameApi,
        handle: CharacterHandle,
        report_rx: mpsc::Receiver<Report>,
        bank_rx: mpsc::Receiver<BankUpdate>,
        cancel: CancellationToken,
        task: tokio::task::JoinHandle<()>,
    }

    fn spawn(api: MockGameApi) -> Harness {
        let (report_tx, report_rx) = mpsc::channel(8);
        let (bank_tx, bank_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let (actor, handle) = CharacterActor::new(
            "ada",
            Arc::new(api.clone()),
            report_tx,
            bank_tx,
            cancel.clone(),
            4,
        );
        let task = tokio::spawn(actor.run());
        Harness {
            api,
            handle,
            report_rx,
            bank_rx,
            cancel,
            task,
        }
    }

    fn world() -> MockGameApi {
        MockGameApi::new().with_tiles(vec![
            MapTile::new(0, 0, ContentKind::None, ""),
            MapTile::new(1, 0, ContentKind::Bank, "bank"),
        ])
    }

    fn ada() -> CharacterStatus {
        let mut status = CharacterStatus::new("ada");
        status.max_inventory = 100;
        status.gold = 30;
        status.skills.insert(Skill::Mining, 1);
        status.inventory = vec![
            ItemStack::new("copper_ore", 4),
            ItemStack::new("", 0),
            ItemStack::new("feather", 2),
        ];
        status
    }

    #[tokio::test]
    async fn missing_character_is_created() {
        let mut harness = spawn(world());

        let report = harness.report_rx.recv().await.unwrap();
        assert_eq!(report.code, ReportCode::Started);
        assert!(report.error.is_none());
        assert_eq!(
            harness.api.calls_for("ada"),
            vec![MockCall::Character, MockCall::CreateCharacter]
        );
        assert_eq!(harness.handle.status().name, "ada");
    }

    #[tokio::test]
    async fn startup_failure_is_reported() {
        let api = world().with_character(ada());
        api.fail_next(MockCall::Character, ApiError::Transport("refused".into()));
        let mut harness = spawn(api);

        let report = harness.report_rx.recv().await.unwrap();
        assert!(matches!(report.error, Some(ActorError::Startup { .. })));
        harness.task.await.unwrap();
    }

    #[tokio::test]
    async fn deposit_empties_inventory_and_notifies_bank() {
        let mut harness = spawn(world().with_character(ada()));
        harness.report_rx.recv().await.unwrap();

        let command = Command::single(Step::Deposit {
            site: Site::new(Position::new(1, 0), "bank"),
            keep: Vec::new(),
        });
        harness.handle.dispatch(command).await.unwrap();

        let report = harness.report_rx.recv().await.unwrap();
        assert_eq!(report.code, ReportCode::Status(StatusCode::OK));
        assert_eq!(
            harness.api.calls_for("ada"),
            vec![
                MockCall::Character,
                MockCall::Move,
                MockCall::DepositItem,
                MockCall::DepositItem,
                MockCall::DepositGold,
            ]
        );

        let mut updates = Vec::new();
        while let Ok(update) = harness.bank_rx.try_recv() {
            updates.push(update);
        }
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2], BankUpdate::gold(30));
        assert_eq!(updates[1].gold, None);

        let status = harness.handle.status();
        assert_eq!(status.carried_items().count(), 0);
        assert_eq!(status.gold, 0);
        assert_eq!(status.position, Position::new(1, 0));
    }

    #[tokio::test]
    async fn move_to_current_tile_makes_no_call() {
        let mut harness = spawn(world().with_character(ada()));
        harness.report_rx.recv().await.unwrap();

        let command = Command::single(Step::Move {
            target: Position::ORIGIN,
        });
        harness.handle.dispatch(command).await.unwrap();

        let report = harness.report_rx.recv().await.unwrap();
        assert_eq!(report.code, ReportCode::Status(StatusCode::OK));
        assert_eq!(harness.api.calls_for("ada"), vec![MockCall::Character]);
    }

    #[tokio::test]
    async fn cancellation_during_cooldown_stops_promptly() {
        let mut harness = spawn(world().with_character(ada()).with_cooldown(3600));
        harness.report_rx.recv().await.unwrap();

        let command = Command::single(Step::Deposit {
            site: Site::new(Position::new(1, 0), "bank"),
            keep: Vec::new(),
        });
        harness.handle.dispatch(command).await.unwrap();

        // Wait for the move to land, then cancel mid-cooldown.
        while harness.handle.status().position != Position::new(1, 0) {
            assert!(harness.handle.changed().await);
        }
        harness.cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), harness.task)
            .await
            .expect("actor stops within the timeout")
            .unwrap();
        assert_eq!(harness.api.count(MockCall::DepositItem), 0);
        assert!(harness.report_rx.recv().await.is_none());
    }
}
