//! Commands sent to the dialer actor from UI controls and the disposition bridge.

use powerdial_protocol::{Disposition, SessionSummary, Target, TargetId};
use tokio::sync::oneshot;

/// A command that can be sent to the dialer actor.
pub enum DialerCommand {
    // -- Lifecycle (fire-and-forget, no-op outside their source phase) --
    /// Capture the given live lead list and start dialing
    Start {
        targets: Vec<Target>,
    },
    Pause,
    Resume,
    Stop,

    // -- Advancing --
    /// Move past the current target and dial the next one
    Skip,
    /// Move past the current target; dial the next one only if `place_call`
    Advance {
        place_call: bool,
    },
    /// Forwarded by the disposition bridge
    DispositionSaved(Disposition),

    // -- Live list notifications --
    /// The target was deleted from the live lead list
    TargetRemoved {
        target_id: TargetId,
    },

    // -- Queries (use oneshot reply channels) --
    /// Get the summary after every previously sent command has been applied
    GetSummary {
        reply: oneshot::Sender<SessionSummary>,
    },
}

impl DialerCommand {
    /// Short tag for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DialerCommand::Start { .. } => "start",
            DialerCommand::Pause => "pause",
            DialerCommand::Resume => "resume",
            DialerCommand::Stop => "stop",
            DialerCommand::Skip => "skip",
            DialerCommand::Advance { .. } => "advance",
            DialerCommand::DispositionSaved(_) => "disposition_saved",
            DialerCommand::TargetRemoved { .. } => "target_removed",
            DialerCommand::GetSummary { .. } => "get_summary",
        }
    }
}
