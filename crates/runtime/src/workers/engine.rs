use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{CharacterHandle, Report, Severity};
use crate::engine::{DecisionEngine, EngineError};

/// Report-processing loop of the decision engine.
///
/// Blocks on the report channel; every report yields exactly one command for
/// the reporting character, or an error. Character-level errors park that
/// character (it receives no further commands); fatal errors end the loop.
pub struct EngineWorker {
    engine: DecisionEngine,
    roster: HashMap<String, CharacterHandle>,
    parked: HashSet<String>,
    report_rx: mpsc::Receiver<Report>,
    cancel: CancellationToken,
}

impl EngineWorker {
    pub fn new(
        engine: DecisionEngine,
        roster: Vec<CharacterHandle>,
        report_rx: mpsc::Receiver<Report>,
        cancel: CancellationToken,
    ) -> Self {
        let roster = roster
            .into_iter()
            .map(|handle| (handle.name().to_string(), handle))
            .collect();
        Self {
            engine,
            roster,
            parked: HashSet::new(),
            report_rx,
            cancel,
        }
    }

    /// Main worker loop
    ///
    /// Returns `Ok(())` on cancellation and the first fatal error otherwise.
    pub async fn run(mut self) -> Result<(), EngineError> {
        debug!(target: "runtime::engine", characters = self.roster.len(), "engine started");

        loop {
            let report = tokio::select! {
                _ = self.cancel.cancelled() => break,
                report = self.report_rx.recv() => match report {
                    Some(report) => report,
                    None => return Err(EngineError::ReportChannelClosed),
                },
            };

            self.handle_report(report).await?;
        }

        debug!(target: "runtime::engine", "engine stopped");
        Ok(())
    }

    async fn handle_report(&mut self, report: Report) -> Result<(), EngineError> {
        let character = report.character.clone();
        let handle = self
            .roster
            .get(&character)
            .ok_or_else(|| EngineError::UnknownCharacter {
                character: character.clone(),
            })?;
        if self.parked.contains(&character) {
            debug!(target: "runtime::engine", %character, "ignoring report from parked character");
            return Ok(());
        }

        debug!(
            target: "runtime::engine",
            %character,
            code = %report.code,
            step = ?report.step,
            "report received"
        );

        let status = handle.status();
        match self.engine.decide(report, &status) {
            Ok(command) => {
                info!(target: "runtime::engine", %character, %command, "dispatching command");
                handle
                    .dispatch(command)
                    .await
                    .map_err(|_| EngineError::CommandChannelClosed { character })
            }
            Err(error) if error.severity() == Severity::Character => {
                warn!(
                    target: "runtime::engine",
                    %character,
                    error = %error,
                    "character failed; no further commands will be sent"
                );
                self.parked.insert(character);
                if self.parked.len() == self.roster.len() {
                    return Err(EngineError::NoActiveCharacters);
                }
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}
