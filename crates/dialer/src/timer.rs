//! Cancelable settle delay
//!
//! The gap between completing one target and dialing the next is a timer,
//! not a blocking wait. The timer is injected so `stop()` can disarm it
//! deterministically and tests can fire it by hand.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Callback run when a settle delay elapses.
pub type SettleCallback = Box<dyn FnOnce() + Send + 'static>;

/// Schedules one-shot callbacks after a delay.
pub trait SettleTimer: Send + Sync + 'static {
    fn schedule(&self, delay: Duration, fire: SettleCallback) -> PendingSettle;
}

/// An armed settle delay. Dropping it does not cancel; call `cancel()`.
pub struct PendingSettle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl PendingSettle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Guarantee the callback will not run (if it hasn't already).
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for PendingSettle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSettle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Timer backed by `tokio::time::sleep` on a spawned task.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSettleTimer;

impl SettleTimer for TokioSettleTimer {
    fn schedule(&self, delay: Duration, fire: SettleCallback) -> PendingSettle {
        let handle: JoinHandle<()> = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
        PendingSettle::new(move || handle.abort())
    }
}

/// Hand-driven timer for deterministic tests.
#[cfg(test)]
pub(crate) mod manual {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::{PendingSettle, SettleCallback, SettleTimer};

    struct Armed {
        delay: Duration,
        cancelled: Arc<AtomicBool>,
        fire: SettleCallback,
    }

    #[derive(Clone, Default)]
    pub(crate) struct ManualSettleTimer {
        armed: Arc<Mutex<Vec<Armed>>>,
    }

    impl ManualSettleTimer {
        /// Number of timers armed and not yet fired (cancelled ones included).
        pub(crate) fn armed(&self) -> usize {
            self.armed.lock().unwrap().len()
        }

        pub(crate) fn delays(&self) -> Vec<Duration> {
            self.armed.lock().unwrap().iter().map(|a| a.delay).collect()
        }

        /// Fire every armed timer that was not cancelled. Returns how many ran.
        pub(crate) fn fire_all(&self) -> usize {
            let armed = std::mem::take(&mut *self.armed.lock().unwrap());
            let mut fired = 0;
            for a in armed {
                if !a.cancelled.load(Ordering::SeqCst) {
                    (a.fire)();
                    fired += 1;
                }
            }
            fired
        }
    }

    impl SettleTimer for ManualSettleTimer {
        fn schedule(&self, delay: Duration, fire: SettleCallback) -> PendingSettle {
            let cancelled = Arc::new(AtomicBool::new(false));
            self.armed.lock().unwrap().push(Armed {
                delay,
                cancelled: cancelled.clone(),
                fire,
            });
            PendingSettle::new(move || cancelled.store(true, Ordering::SeqCst))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, SettleCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (
            count,
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_fires_after_delay() {
        let (count, fire) = counter();
        let _pending = TokioSettleTimer.schedule(Duration::from_millis(300), fire);

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_cancel_prevents_fire() {
        let (count, fire) = counter();
        let pending = TokioSettleTimer.schedule(Duration::from_millis(100), fire);
        pending.cancel();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn manual_timer_skips_cancelled_entries() {
        let timer = manual::ManualSettleTimer::default();
        let (count, fire_a) = counter();
        let c = count.clone();
        let fire_b: SettleCallback = Box::new(move || {
            c.fetch_add(10, Ordering::SeqCst);
        });

        let first = timer.schedule(Duration::from_millis(5), fire_a);
        let _second = timer.schedule(Duration::from_millis(7), fire_b);
        assert_eq!(timer.delays(), vec![Duration::from_millis(5), Duration::from_millis(7)]);

        first.cancel();
        assert_eq!(timer.fire_all(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert_eq!(timer.armed(), 0);
    }
}
