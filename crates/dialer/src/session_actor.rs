//! Dialer actor. Owns the transition state and processes commands sequentially.
//!
//! The actor runs as a single tokio task, which makes it the one logical
//! thread of control every advance goes through. External callers use
//! `DialerHandle`, which sends `DialerCommand` messages over an mpsc channel.
//! Lock-free summary reads go through `ArcSwap`.

use std::sync::Arc;

use arc_swap::ArcSwap;
use powerdial_protocol::{new_id, DialerEvent, Disposition, SessionSummary, Target, TargetId};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::call_adapter::CallPlacer;
use crate::config::DialerConfig;
use crate::disposition::{spawn_disposition_bridge, DispositionSignal};
use crate::error::DialerError;
use crate::session_command::DialerCommand;
use crate::timer::{PendingSettle, SettleTimer};
use crate::transition::{self, Effect, Input, TransitionState};

const COMMAND_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 256;

/// Handle to a running dialer actor (cheap to Clone).
#[derive(Clone)]
pub struct DialerHandle {
    command_tx: mpsc::Sender<DialerCommand>,
    summary: Arc<ArcSwap<SessionSummary>>,
    events: broadcast::Sender<DialerEvent>,
    signal: DispositionSignal,
}

impl DialerHandle {
    /// Spawn the actor and its disposition bridge, returning a handle.
    pub fn spawn(
        config: &DialerConfig,
        placer: Arc<dyn CallPlacer>,
        timer: Arc<dyn SettleTimer>,
    ) -> DialerHandle {
        Self::spawn_with_signal(config, placer, timer, DispositionSignal::new())
    }

    /// Spawn against an existing signal, for call placers that save
    /// dispositions themselves.
    pub fn spawn_with_signal(
        config: &DialerConfig,
        placer: Arc<dyn CallPlacer>,
        timer: Arc<dyn SettleTimer>,
        signal: DispositionSignal,
    ) -> DialerHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (settle_tx, settle_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let summary = Arc::new(ArcSwap::from_pointee(SessionSummary::default()));

        let actor = DialerActor {
            state: TransitionState::new(config.queue.clone(), config.settle_delay()),
            placer,
            timer,
            signal: signal.clone(),
            events: events.clone(),
            summary: summary.clone(),
            settle_tx,
            pending: None,
        };
        tokio::spawn(actor.run(command_rx, settle_rx));
        spawn_disposition_bridge(&signal, &command_tx);

        DialerHandle {
            command_tx,
            summary,
            events,
            signal,
        }
    }

    /// Send a command to the actor (fire-and-forget).
    pub async fn send(&self, cmd: DialerCommand) {
        let name = cmd.name();
        if self.command_tx.send(cmd).await.is_err() {
            warn!(
                component = "dialer_actor",
                command = name,
                "Actor channel closed, command dropped"
            );
        }
    }

    pub async fn start(&self, targets: Vec<Target>) {
        self.send(DialerCommand::Start { targets }).await;
    }

    pub async fn pause(&self) {
        self.send(DialerCommand::Pause).await;
    }

    pub async fn resume(&self) {
        self.send(DialerCommand::Resume).await;
    }

    pub async fn stop(&self) {
        self.send(DialerCommand::Stop).await;
    }

    pub async fn skip(&self) {
        self.send(DialerCommand::Skip).await;
    }

    pub async fn advance(&self, place_call: bool) {
        self.send(DialerCommand::Advance { place_call }).await;
    }

    /// Notify the sequencer that a target was deleted from the live list.
    pub async fn remove_target(&self, target_id: impl Into<TargetId>) {
        self.send(DialerCommand::TargetRemoved {
            target_id: target_id.into(),
        })
        .await;
    }

    /// Lock-free summary read. May lag commands still queued in the actor.
    pub fn summary(&self) -> Arc<SessionSummary> {
        self.summary.load_full()
    }

    /// Summary after every command sent so far has been applied.
    pub async fn fetch_summary(&self) -> Result<SessionSummary, DialerError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(DialerCommand::GetSummary { reply })
            .await
            .map_err(|_| DialerError::ActorClosed)?;
        rx.await.map_err(|_| DialerError::ActorClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DialerEvent> {
        self.events.subscribe()
    }

    /// The shared "disposition saved" signal for the disposition form.
    pub fn disposition_signal(&self) -> DispositionSignal {
        self.signal.clone()
    }

    pub fn save_disposition(&self, disposition: Disposition) {
        self.signal.save(disposition);
    }
}

struct DialerActor {
    state: TransitionState,
    placer: Arc<dyn CallPlacer>,
    timer: Arc<dyn SettleTimer>,
    signal: DispositionSignal,
    events: broadcast::Sender<DialerEvent>,
    summary: Arc<ArcSwap<SessionSummary>>,
    settle_tx: mpsc::UnboundedSender<u64>,
    /// Armed settle timer and its generation
    pending: Option<(u64, PendingSettle)>,
}

impl DialerActor {
    async fn run(
        mut self,
        mut command_rx: mpsc::Receiver<DialerCommand>,
        mut settle_rx: mpsc::UnboundedReceiver<u64>,
    ) {
        loop {
            // Expired settles go first so a query never overtakes one that
            // has already fired.
            tokio::select! {
                biased;

                Some(generation) = settle_rx.recv() => {
                    if self.pending.as_ref().is_some_and(|(g, _)| *g == generation) {
                        self.pending = None;
                    }
                    self.apply(Input::SettleElapsed { generation });
                }

                cmd = command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        break;
                    };
                    self.handle_command(cmd);
                }
            }
        }

        if let Some((_, pending)) = self.pending.take() {
            pending.cancel();
        }
        debug!(component = "dialer_actor", "All handles dropped, actor stopped");
    }

    fn handle_command(&mut self, cmd: DialerCommand) {
        let input = match cmd {
            DialerCommand::GetSummary { reply } => {
                let _ = reply.send(self.state.summary());
                return;
            }
            DialerCommand::Start { targets } => Input::Start {
                session_id: new_id(),
                targets,
            },
            DialerCommand::Pause => Input::Pause,
            DialerCommand::Resume => Input::Resume {
                pending_disposition: self.signal.current(),
            },
            DialerCommand::Stop => Input::Stop,
            DialerCommand::Skip => Input::Skip,
            DialerCommand::Advance { place_call } => Input::Advance { place_call },
            DialerCommand::DispositionSaved(disposition) => Input::DispositionSaved(disposition),
            DialerCommand::TargetRemoved { target_id } => Input::TargetRemoved { target_id },
        };
        self.apply(input);
    }

    fn apply(&mut self, input: Input) {
        let state = std::mem::take(&mut self.state);
        let (new_state, effects) = transition::transition(state, input, &chrono_now());
        self.state = new_state;

        for effect in effects {
            self.execute(effect);
        }
        self.summary.store(Arc::new(self.state.summary()));
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::PlaceCall(target) => {
                info!(
                    component = "dialer_actor",
                    event = "dialer.call.requested",
                    target_id = %target.id,
                    "Placing call"
                );
                self.placer.place_call(&target);
            }
            Effect::ScheduleSettle { generation, delay } => {
                if let Some((_, previous)) = self.pending.take() {
                    previous.cancel();
                }
                let tx = self.settle_tx.clone();
                let pending = self.timer.schedule(
                    delay,
                    Box::new(move || {
                        let _ = tx.send(generation);
                    }),
                );
                self.pending = Some((generation, pending));
            }
            Effect::CancelSettle => {
                if let Some((generation, pending)) = self.pending.take() {
                    debug!(component = "dialer_actor", generation, "Settle cancelled");
                    pending.cancel();
                }
            }
            Effect::ResetDisposition => self.signal.reset(),
            Effect::ConsumeDisposition(disposition) => {
                self.signal.consume(&disposition);
            }
            Effect::Emit(event) => {
                log_event(&event);
                // No subscribers is fine
                let _ = self.events.send(event);
            }
        }
    }
}

fn log_event(event: &DialerEvent) {
    match event {
        DialerEvent::SessionStarted { session_id, total } => info!(
            component = "dialer_actor",
            event = "dialer.session.started",
            session_id = %session_id,
            total,
            "Session started"
        ),
        DialerEvent::SessionEnded {
            session_id,
            completed,
        } => info!(
            component = "dialer_actor",
            event = "dialer.session.ended",
            session_id = %session_id,
            completed,
            "Queue exhausted"
        ),
        DialerEvent::SessionStopped { session_id } => info!(
            component = "dialer_actor",
            event = "dialer.session.stopped",
            session_id = %session_id,
            "Session stopped"
        ),
        other => debug!(component = "dialer_actor", event = ?other, "Dialer event"),
    }
}

/// Get current time as a unix-seconds timestamp
fn chrono_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}Z", duration.as_secs())
}
