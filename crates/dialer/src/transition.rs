//! Pure state transition function
//!
//! All sequencing logic lives here as a pure, synchronous function:
//! `transition(state, input) -> (state, effects)`. Placing calls, arming
//! timers and broadcasting are described as effects and executed by the
//! session actor. Nothing here does IO or awaits.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use powerdial_protocol::{DialerEvent, Disposition, SessionPhase, SessionSummary, Target, TargetId};
use tracing::debug;

use crate::snapshot::{QueuePolicy, TargetQueue};

// ---------------------------------------------------------------------------
// DialerPhase: explicit session state machine
// ---------------------------------------------------------------------------

/// A live campaign session. Only exists while `Active` or `Paused`.
#[derive(Debug, Clone)]
pub struct CampaignSession {
    pub id: String,
    pub queue: TargetQueue,
    pub current_index: usize,
    pub completed: HashSet<TargetId>,
    pub dispositions: HashMap<TargetId, String>,
    /// Targets deleted from the live list after capture
    pub removed: HashSet<TargetId>,
    pub started_at: String,
    /// Generation of the outstanding settle delay. `Some` means an advance
    /// is in flight and further advances are dropped.
    pending_settle: Option<u64>,
    /// Settle delay elapsed while paused; the current target still needs its call.
    call_pending: bool,
}

impl CampaignSession {
    fn new(id: String, queue: TargetQueue, now: &str) -> Self {
        Self {
            id,
            queue,
            current_index: 0,
            completed: HashSet::new(),
            dispositions: HashMap::new(),
            removed: HashSet::new(),
            started_at: now.to_string(),
            pending_settle: None,
            call_pending: false,
        }
    }

    pub fn current_target(&self) -> Option<&Target> {
        self.queue.get(self.current_index)
    }

    pub fn is_advancing(&self) -> bool {
        self.pending_settle.is_some()
    }

    fn current_is_removed(&self) -> bool {
        self.current_target()
            .is_some_and(|t| self.removed.contains(&t.id))
    }

    fn into_ended(self) -> EndedSession {
        EndedSession {
            id: self.id,
            queue: self.queue,
            completed: self.completed,
            dispositions: self.dispositions,
            started_at: self.started_at,
        }
    }
}

/// Final bookkeeping of a session that ran out of targets.
#[derive(Debug, Clone)]
pub struct EndedSession {
    pub id: String,
    pub queue: TargetQueue,
    pub completed: HashSet<TargetId>,
    pub dispositions: HashMap<TargetId, String>,
    pub started_at: String,
}

#[derive(Debug, Clone, Default)]
pub enum DialerPhase {
    #[default]
    Idle,
    Active(CampaignSession),
    Paused(CampaignSession),
    Ended(EndedSession),
}

impl DialerPhase {
    pub fn kind(&self) -> SessionPhase {
        match self {
            DialerPhase::Idle => SessionPhase::Idle,
            DialerPhase::Active(_) => SessionPhase::Active,
            DialerPhase::Paused(_) => SessionPhase::Paused,
            DialerPhase::Ended(_) => SessionPhase::Ended,
        }
    }

    pub fn session(&self) -> Option<&CampaignSession> {
        match self {
            DialerPhase::Active(s) | DialerPhase::Paused(s) => Some(s),
            _ => None,
        }
    }
}

/// Check if a phase transition is valid.
///
/// ```text
/// Idle ──start──▶ Active ──pause──▶ Paused
///   ▲               │  ◀──resume──    │
///   │             exhaust             │
///   │               ▼                 │
///   └────stop──── Ended ──start──▶ Active
///   └────stop──────────────────────────┘ (from Active/Paused)
/// ```
pub fn is_transition_allowed(from: SessionPhase, to: SessionPhase) -> bool {
    use SessionPhase::*;

    matches!(
        (from, to),
        (Idle, Active)
            | (Ended, Active)
            | (Active, Paused)
            | (Paused, Active)
            | (Active, Ended)
            | (Active, Idle)
            | (Paused, Idle)
            | (Ended, Idle)
    )
}

// ---------------------------------------------------------------------------
// TransitionState: pure data owned by the actor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TransitionState {
    pub phase: DialerPhase,
    pub policy: QueuePolicy,
    pub settle_delay: Duration,
    /// Next settle generation. Never reused, so a timer from a stopped
    /// session can't match a later one.
    next_generation: u64,
}

impl Default for TransitionState {
    fn default() -> Self {
        Self::new(QueuePolicy::default(), Duration::ZERO)
    }
}

impl TransitionState {
    pub fn new(policy: QueuePolicy, settle_delay: Duration) -> Self {
        Self {
            phase: DialerPhase::Idle,
            policy,
            settle_delay,
            next_generation: 1,
        }
    }

    /// Build the read-only display view.
    pub fn summary(&self) -> SessionSummary {
        match &self.phase {
            DialerPhase::Idle => SessionSummary::default(),
            DialerPhase::Active(s) | DialerPhase::Paused(s) => SessionSummary {
                session_id: Some(s.id.clone()),
                phase: self.phase.kind(),
                current_index: Some(s.current_index),
                current_target: s.current_target().cloned(),
                total: s.queue.len(),
                completed: in_queue_order(&s.queue, &s.completed),
                dispositions: s.dispositions.clone(),
                started_at: Some(s.started_at.clone()),
            },
            DialerPhase::Ended(e) => SessionSummary {
                session_id: Some(e.id.clone()),
                phase: SessionPhase::Ended,
                current_index: None,
                current_target: None,
                total: e.queue.len(),
                completed: in_queue_order(&e.queue, &e.completed),
                dispositions: e.dispositions.clone(),
                started_at: Some(e.started_at.clone()),
            },
        }
    }

    fn take_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}

fn in_queue_order(queue: &TargetQueue, ids: &HashSet<TargetId>) -> Vec<TargetId> {
    queue
        .iter()
        .filter(|t| ids.contains(&t.id))
        .map(|t| t.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Input / Effect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Input {
    /// Capture `targets` and begin dialing
    Start {
        session_id: String,
        targets: Vec<Target>,
    },
    Pause,
    /// `pending_disposition` is whatever the disposition signal held while paused
    Resume {
        pending_disposition: Option<Disposition>,
    },
    Stop,
    Skip,
    Advance {
        place_call: bool,
    },
    DispositionSaved(Disposition),
    SettleElapsed {
        generation: u64,
    },
    TargetRemoved {
        target_id: TargetId,
    },
}

/// IO to be executed by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Hand the target to the telephony collaborator
    PlaceCall(Target),
    /// Arm the settle timer; it reports back with `Input::SettleElapsed`
    ScheduleSettle { generation: u64, delay: Duration },
    /// Disarm any outstanding settle timer
    CancelSettle,
    /// Clear the disposition signal
    ResetDisposition,
    /// Clear the signal only if it still holds this disposition
    ConsumeDisposition(Disposition),
    Emit(DialerEvent),
}

// ---------------------------------------------------------------------------
// transition(): the pure core
// ---------------------------------------------------------------------------

/// Pure, synchronous state transition.
///
/// Commands that are not valid in the current phase are silent no-ops.
pub fn transition(
    mut state: TransitionState,
    input: Input,
    now: &str,
) -> (TransitionState, Vec<Effect>) {
    let mut effects: Vec<Effect> = Vec::new();

    match input {
        Input::Start {
            session_id,
            targets,
        } => start(&mut state, session_id, &targets, now, &mut effects),
        Input::Pause => pause(&mut state, &mut effects),
        Input::Resume {
            pending_disposition,
        } => resume(&mut state, pending_disposition, &mut effects),
        Input::Stop => stop(&mut state, &mut effects),
        Input::Skip => advance(&mut state, true, &mut effects),
        Input::Advance { place_call } => advance(&mut state, place_call, &mut effects),
        Input::DispositionSaved(disposition) => {
            disposition_saved(&mut state, disposition, &mut effects);
        }
        Input::SettleElapsed { generation } => settle_elapsed(&mut state, generation, &mut effects),
        Input::TargetRemoved { target_id } => target_removed(&mut state, target_id, &mut effects),
    }

    (state, effects)
}

fn start(
    state: &mut TransitionState,
    session_id: String,
    targets: &[Target],
    now: &str,
    effects: &mut Vec<Effect>,
) {
    let from = state.phase.kind();
    if !is_transition_allowed(from, SessionPhase::Active) {
        debug!(component = "dialer", phase = %from, "start ignored");
        return;
    }

    let queue = TargetQueue::capture(targets, &state.policy);
    let session = CampaignSession::new(session_id, queue, now);

    effects.push(Effect::ResetDisposition);
    effects.push(Effect::Emit(DialerEvent::SessionStarted {
        session_id: session.id.clone(),
        total: session.queue.len(),
    }));

    let Some(first) = session.current_target().cloned() else {
        effects.push(Effect::Emit(DialerEvent::SessionEnded {
            session_id: session.id.clone(),
            completed: 0,
        }));
        state.phase = DialerPhase::Ended(session.into_ended());
        return;
    };

    effects.push(Effect::PlaceCall(first.clone()));
    effects.push(Effect::Emit(DialerEvent::CallRequested {
        session_id: session.id.clone(),
        index: 0,
        target: first,
    }));
    state.phase = DialerPhase::Active(session);
}

fn pause(state: &mut TransitionState, effects: &mut Vec<Effect>) {
    let phase = std::mem::take(&mut state.phase);
    state.phase = match phase {
        DialerPhase::Active(session) => {
            effects.push(Effect::Emit(DialerEvent::SessionPaused {
                session_id: session.id.clone(),
            }));
            DialerPhase::Paused(session)
        }
        other => {
            debug!(component = "dialer", phase = %other.kind(), "pause ignored");
            other
        }
    };
}

fn resume(
    state: &mut TransitionState,
    pending_disposition: Option<Disposition>,
    effects: &mut Vec<Effect>,
) {
    let session = match std::mem::take(&mut state.phase) {
        DialerPhase::Paused(session) => session,
        other => {
            debug!(component = "dialer", phase = %other.kind(), "resume ignored");
            state.phase = other;
            return;
        }
    };

    effects.push(Effect::Emit(DialerEvent::SessionResumed {
        session_id: session.id.clone(),
    }));
    state.phase = DialerPhase::Active(session);

    // A disposition saved while paused was left on the signal; consume it now.
    if let Some(disposition) = pending_disposition {
        if disposition_saved(state, disposition, effects) {
            return;
        }
    }

    let (removed, call_pending) = match &state.phase {
        DialerPhase::Active(s) if !s.is_advancing() => (s.current_is_removed(), s.call_pending),
        _ => return,
    };

    if removed {
        advance(state, true, effects);
    } else if call_pending {
        place_current_call(state, effects);
    }
}

fn stop(state: &mut TransitionState, effects: &mut Vec<Effect>) {
    let from = state.phase.kind();
    if !is_transition_allowed(from, SessionPhase::Idle) {
        debug!(component = "dialer", phase = %from, "stop ignored");
        return;
    }

    let session_id = match &state.phase {
        DialerPhase::Active(s) | DialerPhase::Paused(s) => {
            if s.is_advancing() {
                effects.push(Effect::CancelSettle);
            }
            Some(s.id.clone())
        }
        _ => None,
    };

    effects.push(Effect::ResetDisposition);
    if let Some(session_id) = session_id {
        effects.push(Effect::Emit(DialerEvent::SessionStopped { session_id }));
    }
    state.phase = DialerPhase::Idle;
}

/// The single path that moves `current_index` forward.
fn advance(state: &mut TransitionState, place_call: bool, effects: &mut Vec<Effect>) {
    let mut session = match std::mem::take(&mut state.phase) {
        DialerPhase::Active(session) => session,
        other => {
            debug!(component = "dialer", phase = %other.kind(), "advance ignored");
            state.phase = other;
            return;
        }
    };

    if session.is_advancing() {
        debug!(
            component = "dialer",
            session_id = %session.id,
            index = session.current_index,
            "advance dropped, another advance is in flight"
        );
        state.phase = DialerPhase::Active(session);
        return;
    }

    // Complete the current target, then step over any queued targets that
    // were deleted from the live list while we were busy.
    loop {
        complete_current(&mut session, effects);

        if Some(session.current_index) == session.queue.last_index() {
            effects.push(Effect::Emit(DialerEvent::SessionEnded {
                session_id: session.id.clone(),
                completed: session.completed.len(),
            }));
            state.phase = DialerPhase::Ended(session.into_ended());
            return;
        }

        session.current_index += 1;
        session.call_pending = false;

        if !session.current_is_removed() {
            break;
        }
    }

    if place_call {
        let generation = state.take_generation();
        session.pending_settle = Some(generation);
        effects.push(Effect::ScheduleSettle {
            generation,
            delay: state.settle_delay,
        });
    }

    state.phase = DialerPhase::Active(session);
}

fn complete_current(session: &mut CampaignSession, effects: &mut Vec<Effect>) {
    let Some(target) = session.current_target() else {
        return;
    };
    let target_id = target.id.clone();
    let index = session.current_index;

    if !session.completed.insert(target_id.clone()) {
        return;
    }

    let event = if session.removed.contains(&target_id) {
        DialerEvent::TargetSkipped {
            session_id: session.id.clone(),
            index,
            target_id,
        }
    } else {
        DialerEvent::TargetCompleted {
            session_id: session.id.clone(),
            index,
            target_id,
        }
    };
    effects.push(Effect::Emit(event));
}

/// Returns true when the disposition triggered an advance.
fn disposition_saved(
    state: &mut TransitionState,
    disposition: Disposition,
    effects: &mut Vec<Effect>,
) -> bool {
    let phase = state.phase.kind();
    let DialerPhase::Active(session) = &mut state.phase else {
        // Paused keeps the signal set for resume; Idle/Ended have nothing to record.
        debug!(
            component = "dialer",
            phase = %phase,
            target_id = %disposition.target_id,
            "disposition not consumed"
        );
        return false;
    };

    effects.push(Effect::ConsumeDisposition(disposition.clone()));

    if session.queue.position(&disposition.target_id).is_none() {
        debug!(
            component = "dialer",
            session_id = %session.id,
            target_id = %disposition.target_id,
            "disposition for target outside the queue"
        );
        return false;
    }

    session
        .dispositions
        .insert(disposition.target_id.clone(), disposition.label.clone());
    effects.push(Effect::Emit(DialerEvent::DispositionRecorded {
        session_id: session.id.clone(),
        target_id: disposition.target_id.clone(),
        label: disposition.label,
    }));

    let is_current = session
        .current_target()
        .is_some_and(|t| t.id == disposition.target_id);
    if !is_current || session.is_advancing() {
        return false;
    }

    advance(state, true, effects);
    true
}

fn settle_elapsed(state: &mut TransitionState, generation: u64, effects: &mut Vec<Effect>) {
    let session = match &mut state.phase {
        DialerPhase::Active(s) | DialerPhase::Paused(s)
            if s.pending_settle == Some(generation) =>
        {
            s
        }
        _ => {
            debug!(component = "dialer", generation, "stale settle ignored");
            return;
        }
    };
    session.pending_settle = None;

    if let DialerPhase::Paused(s) = &mut state.phase {
        s.call_pending = true;
        return;
    }

    let removed = state.phase.session().is_some_and(|s| s.current_is_removed());
    if removed {
        advance(state, true, effects);
    } else {
        place_current_call(state, effects);
    }
}

fn target_removed(state: &mut TransitionState, target_id: TargetId, effects: &mut Vec<Effect>) {
    let (is_active, session) = match &mut state.phase {
        DialerPhase::Active(s) => (true, s),
        DialerPhase::Paused(s) => (false, s),
        _ => return,
    };

    let Some(position) = session.queue.position(&target_id) else {
        return;
    };
    if position < session.current_index || session.completed.contains(&target_id) {
        return;
    }

    session.removed.insert(target_id);

    // Deleting the target on the line is an auto-skip. Paused sessions skip
    // on resume; an in-flight advance skips when its settle elapses.
    if position == session.current_index && is_active && !session.is_advancing() {
        advance(state, true, effects);
    }
}

fn place_current_call(state: &mut TransitionState, effects: &mut Vec<Effect>) {
    let DialerPhase::Active(session) = &mut state.phase else {
        return;
    };
    let Some(target) = session.current_target().cloned() else {
        return;
    };
    session.call_pending = false;

    effects.push(Effect::PlaceCall(target.clone()));
    effects.push(Effect::Emit(DialerEvent::CallRequested {
        session_id: session.id.clone(),
        index: session.current_index,
        target,
    }));
}
