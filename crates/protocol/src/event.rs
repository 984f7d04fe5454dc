//! Sequencer → subscriber events

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Events broadcast by the sequencer as the session moves along
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialerEvent {
    // Lifecycle
    SessionStarted {
        session_id: String,
        total: usize,
    },
    SessionPaused {
        session_id: String,
    },
    SessionResumed {
        session_id: String,
    },
    /// Queue exhausted naturally
    SessionEnded {
        session_id: String,
        completed: usize,
    },
    /// Operator stopped the session; all state discarded
    SessionStopped {
        session_id: String,
    },

    // Sequencing
    CallRequested {
        session_id: String,
        index: usize,
        target: Target,
    },
    TargetCompleted {
        session_id: String,
        index: usize,
        target_id: TargetId,
    },
    /// Target was deleted from the lead list before it was reached
    TargetSkipped {
        session_id: String,
        index: usize,
        target_id: TargetId,
    },
    DispositionRecorded {
        session_id: String,
        target_id: TargetId,
        label: String,
    },
}

impl DialerEvent {
    pub fn session_id(&self) -> &str {
        match self {
            DialerEvent::SessionStarted { session_id, .. }
            | DialerEvent::SessionPaused { session_id }
            | DialerEvent::SessionResumed { session_id }
            | DialerEvent::SessionEnded { session_id, .. }
            | DialerEvent::SessionStopped { session_id }
            | DialerEvent::CallRequested { session_id, .. }
            | DialerEvent::TargetCompleted { session_id, .. }
            | DialerEvent::TargetSkipped { session_id, .. }
            | DialerEvent::DispositionRecorded { session_id, .. } => session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = DialerEvent::CallRequested {
            session_id: "s1".into(),
            index: 0,
            target: Target::new("t1", "Ada", "+15550100"),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "call_requested");
        assert_eq!(value["target"]["id"], "t1");
        assert_eq!(event.session_id(), "s1");
    }
}
