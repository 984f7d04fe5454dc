//! Call lifecycle adapter
//!
//! The boundary to the telephony collaborator. The sequencer only needs a
//! side-effecting trigger: ringing, connect, hang-up and failures are the
//! collaborator's business, and it reports the outcome back through the
//! disposition signal like any agent would.

use powerdial_protocol::Target;
use tokio::sync::mpsc;
use tracing::warn;

/// Places a call. Fire-and-forget; must not block.
pub trait CallPlacer: Send + Sync + 'static {
    fn place_call(&self, target: &Target);
}

/// Forwards every call request to a channel.
#[derive(Debug, Clone)]
pub struct ChannelCallPlacer {
    tx: mpsc::UnboundedSender<Target>,
}

impl ChannelCallPlacer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Target>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl CallPlacer for ChannelCallPlacer {
    fn place_call(&self, target: &Target) {
        if self.tx.send(target.clone()).is_err() {
            warn!(
                component = "call_adapter",
                target_id = %target.id,
                "Call receiver dropped, call request lost"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_placer_forwards_targets_in_order() {
        let (placer, mut rx) = ChannelCallPlacer::new();
        placer.place_call(&Target::new("a", "Ada", "+1"));
        placer.place_call(&Target::new("b", "Bo", "+2"));

        assert_eq!(rx.try_recv().unwrap().id, "a");
        assert_eq!(rx.try_recv().unwrap().id, "b");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_placer_survives_dropped_receiver() {
        let (placer, rx) = ChannelCallPlacer::new();
        drop(rx);
        placer.place_call(&Target::new("a", "Ada", "+1"));
    }
}
