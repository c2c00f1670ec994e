//! Cloneable façade over a running character actor.
//!
//! [`CharacterHandle`] hides the channel plumbing: commands go in through an
//! mpsc queue, and the latest status snapshot is read from a watch channel so
//! callers always get an owned copy instead of a view into actor state.
use tokio::sync::{mpsc, watch};

use game_core::CharacterStatus;

use crate::command::Command;

#[derive(Clone, Debug)]
pub struct CharacterHandle {
    name: String,
    command_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<CharacterStatus>,
}

impl CharacterHandle {
    pub(crate) fn new(
        name: String,
        command_tx: mpsc::Sender<Command>,
        status_rx: watch::Receiver<CharacterStatus>,
    ) -> Self {
        Self {
            name,
            command_tx,
            status_rx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest published status snapshot.
    pub fn status(&self) -> CharacterStatus {
        self.status_rx.borrow().clone()
    }

    /// Waits until the actor publishes a new snapshot.
    ///
    /// Returns `false` once the actor is gone.
    pub async fn changed(&mut self) -> bool {
        self.status_rx.changed().await.is_ok()
    }

    /// Queues a command for the actor.
    ///
    /// Returns the command back if the actor has stopped.
    pub async fn dispatch(&self, command: Command) -> std::result::Result<(), Command> {
        self.command_tx
            .send(command)
            .await
            .map_err(|mpsc::error::SendError(command)| command)
    }
}
