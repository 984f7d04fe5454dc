//! Disposition sync bridge
//!
//! The disposition form and the sequencer don't know about each other. The
//! form flips a shared signal; the bridge task notices and hands the
//! disposition to the session actor, which resets the signal once consumed.

use std::sync::Arc;

use powerdial_protocol::Disposition;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::session_command::DialerCommand;

/// Externally writable "disposition saved" flag. `None` means not saved.
#[derive(Debug, Clone)]
pub struct DispositionSignal {
    tx: Arc<watch::Sender<Option<Disposition>>>,
}

impl Default for DispositionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl DispositionSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Setter used by the disposition form (or the telephony collaborator).
    pub fn save(&self, disposition: Disposition) {
        self.tx.send_replace(Some(disposition));
    }

    pub fn is_saved(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn current(&self) -> Option<Disposition> {
        self.tx.borrow().clone()
    }

    pub fn reset(&self) {
        self.tx.send_if_modified(|value| value.take().is_some());
    }

    /// Clear the signal if it still holds `consumed`. A newer save is left
    /// in place for the bridge to forward.
    pub fn consume(&self, consumed: &Disposition) -> bool {
        self.tx.send_if_modified(|value| {
            if value.as_ref() == Some(consumed) {
                value.take();
                true
            } else {
                false
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Disposition>> {
        self.tx.subscribe()
    }
}

/// Watch the signal and forward every save to the actor.
///
/// The bridge only holds a weak sender so it never keeps the actor alive.
/// It exits when the signal is dropped or the actor has shut down.
pub fn spawn_disposition_bridge(
    signal: &DispositionSignal,
    command_tx: &mpsc::Sender<DialerCommand>,
) -> JoinHandle<()> {
    let mut rx = signal.subscribe();
    let command_tx = command_tx.downgrade();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let saved = rx.borrow_and_update().clone();
            let Some(disposition) = saved else {
                continue;
            };

            let Some(tx) = command_tx.upgrade() else {
                debug!(component = "disposition_bridge", "Actor gone, bridge stopped");
                return;
            };
            debug!(
                component = "disposition_bridge",
                target_id = %disposition.target_id,
                label = %disposition.label,
                "Disposition saved, forwarding"
            );
            if tx
                .send(DialerCommand::DispositionSaved(disposition))
                .await
                .is_err()
            {
                warn!(
                    component = "disposition_bridge",
                    "Actor channel closed, disposition dropped"
                );
                return;
            }
        }
    })
}
