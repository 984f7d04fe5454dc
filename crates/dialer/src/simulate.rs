//! Simulated telephony driver used by `powerdial simulate`.
//!
//! Every placed call is answered after a fixed delay. The simulated agent
//! then marks the lead contacted in the live list and saves a disposition
//! through the shared signal, exactly as a disposition form would.

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use powerdial_protocol::{DialerEvent, Disposition, LeadStatus, SessionSummary, Target, TargetId};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::call_adapter::CallPlacer;
use crate::config::DialerConfig;
use crate::disposition::DispositionSignal;
use crate::error::DialerError;
use crate::session_actor::DialerHandle;
use crate::timer::TokioSettleTimer;

/// The externally owned, mutable lead list a session snapshots from.
#[derive(Clone, Default)]
pub struct LiveLeadList {
    inner: Arc<RwLock<Vec<Target>>>,
}

impl LiveLeadList {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(targets)),
        }
    }

    /// Copy of the current list, in display order.
    pub fn snapshot(&self) -> Vec<Target> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns false when the lead is not in the list.
    pub fn set_status(&self, id: &str, status: LeadStatus) -> bool {
        let mut targets = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match targets.iter_mut().find(|t| t.id == id) {
            Some(target) => {
                target.status = status;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<Target> {
        let mut targets = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = targets.iter().position(|t| t.id == id)?;
        Some(targets.remove(index))
    }
}

/// Load a JSON array of leads.
pub fn load_leads(path: &Path) -> Result<Vec<Target>, DialerError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DialerError::LeadFileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DialerError::LeadFileParse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// How long each simulated call rings before it is answered
    pub answer_after: Duration,
    /// Label saved for every answered call
    pub disposition: String,
    /// Leads deleted from the live list right after the session starts
    pub delete: Vec<TargetId>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            answer_after: Duration::from_millis(50),
            disposition: "connected".to_string(),
            delete: Vec::new(),
        }
    }
}

/// Call placer that answers every call and dispositions it.
pub struct SimulatedTelephony {
    live: LiveLeadList,
    signal: DispositionSignal,
    options: SimulationOptions,
}

impl SimulatedTelephony {
    pub fn new(live: LiveLeadList, signal: DispositionSignal, options: SimulationOptions) -> Self {
        Self {
            live,
            signal,
            options,
        }
    }
}

impl CallPlacer for SimulatedTelephony {
    fn place_call(&self, target: &Target) {
        let live = self.live.clone();
        let signal = self.signal.clone();
        let answer_after = self.options.answer_after;
        let label = self.options.disposition.clone();
        let target_id = target.id.clone();

        debug!(
            component = "simulate",
            target_id = %target_id,
            phone = %target.phone,
            "Dialing"
        );
        tokio::spawn(async move {
            tokio::time::sleep(answer_after).await;
            if !live.set_status(&target_id, LeadStatus::Contacted) {
                debug!(
                    component = "simulate",
                    target_id = %target_id,
                    "Answered lead no longer in live list"
                );
            }
            signal.save(Disposition::new(target_id, label));
        });
    }
}

/// Run one session over `leads` to completion and return the final summary.
pub async fn run_simulation(
    config: &DialerConfig,
    leads: Vec<Target>,
    mut options: SimulationOptions,
) -> Result<SessionSummary, DialerError> {
    let live = LiveLeadList::new(leads);
    let signal = DispositionSignal::new();
    let deletions = std::mem::take(&mut options.delete);
    let telephony = SimulatedTelephony::new(live.clone(), signal.clone(), options);
    let handle = DialerHandle::spawn_with_signal(
        config,
        Arc::new(telephony),
        Arc::new(TokioSettleTimer),
        signal,
    );

    let mut events = handle.subscribe();
    handle.start(live.snapshot()).await;

    for target_id in deletions {
        if live.remove(&target_id).is_some() {
            handle.remove_target(target_id).await;
        } else {
            warn!(
                component = "simulate",
                target_id = %target_id,
                "Lead to delete is not in the live list"
            );
        }
    }

    loop {
        match events.recv().await {
            Ok(DialerEvent::SessionEnded {
                session_id,
                completed,
            }) => {
                info!(
                    component = "simulate",
                    session_id = %session_id,
                    completed,
                    "Simulation finished"
                );
                break;
            }
            Ok(DialerEvent::SessionStopped { .. }) => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(component = "simulate", skipped, "Event stream lagged");
                if !handle.fetch_summary().await?.is_running() {
                    break;
                }
            }
            Err(RecvError::Closed) => return Err(DialerError::ActorClosed),
        }
    }

    handle.fetch_summary().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerdial_protocol::SessionPhase;

    fn status_of(live: &LiveLeadList, id: &str) -> Option<LeadStatus> {
        live.snapshot().into_iter().find(|t| t.id == id).map(|t| t.status)
    }

    fn leads() -> Vec<Target> {
        vec![
            Target::new("a", "Ada", "+15550001"),
            Target::new("b", "Bob", "+15550002").with_status(LeadStatus::Qualified),
            Target::new("c", "Cy", "+15550003"),
        ]
    }

    #[test]
    fn live_list_updates_and_removes() {
        let live = LiveLeadList::new(leads());
        assert!(live.set_status("a", LeadStatus::Lost));
        assert_eq!(status_of(&live, "a"), Some(LeadStatus::Lost));
        assert!(!live.set_status("zzz", LeadStatus::Lost));

        assert_eq!(live.remove("b").map(|t| t.id), Some("b".to_string()));
        assert!(live.remove("b").is_none());
        assert_eq!(live.snapshot().len(), 2);
    }

    #[test]
    fn load_leads_reads_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.json");
        std::fs::write(
            &path,
            r#"[{"id":"a","name":"Ada","phone":"+1555"},{"id":"b","name":"Bob","phone":"+1556","status":"qualified","company":"Acme"}]"#,
        )
        .unwrap();

        let loaded = load_leads(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].status, LeadStatus::New);
        assert_eq!(loaded[1].company.as_deref(), Some("Acme"));
    }

    #[test]
    fn load_leads_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            load_leads(&missing),
            Err(DialerError::LeadFileRead { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(
            load_leads(&bad),
            Err(DialerError::LeadFileParse { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn simulation_dials_every_lead_in_order() {
        let config = DialerConfig::default().with_settle_delay(Duration::from_millis(300));
        let summary = run_simulation(&config, leads(), SimulationOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.phase, SessionPhase::Ended);
        assert_eq!(summary.completed, vec!["a", "b", "c"]);
        assert_eq!(summary.dispositions.len(), 3);
        assert!(summary.dispositions.values().all(|l| l == "connected"));
        assert_eq!(summary.progress_percent(), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn simulation_respects_queue_policy() {
        let config = DialerConfig::default().with_queue(crate::snapshot::QueuePolicy {
            include_statuses: Some(vec![LeadStatus::New]),
            ..Default::default()
        });
        let options = SimulationOptions {
            disposition: "voicemail".to_string(),
            ..Default::default()
        };
        let summary = run_simulation(&config, leads(), options).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.completed, vec!["a", "c"]);
        assert_eq!(summary.dispositions.get("c").map(String::as_str), Some("voicemail"));
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_leads_are_completed_without_a_call() {
        let options = SimulationOptions {
            delete: vec!["b".to_string(), "missing".to_string()],
            ..Default::default()
        };
        let summary = run_simulation(&DialerConfig::default(), leads(), options)
            .await
            .unwrap();

        assert_eq!(summary.phase, SessionPhase::Ended);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, vec!["a", "b", "c"]);
        assert!(!summary.dispositions.contains_key("b"));
        assert_eq!(summary.dispositions.len(), 2);
    }

    #[tokio::test]
    async fn simulation_of_empty_list_ends_immediately() {
        let summary = run_simulation(&DialerConfig::default(), Vec::new(), SimulationOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.phase, SessionPhase::Ended);
        assert_eq!(summary.total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn answered_calls_mark_live_leads_contacted() {
        let live = LiveLeadList::new(leads());
        let signal = DispositionSignal::new();
        let telephony = SimulatedTelephony::new(
            live.clone(),
            signal.clone(),
            SimulationOptions {
                answer_after: Duration::from_millis(10),
                ..Default::default()
            },
        );

        telephony.place_call(&leads()[0]);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(status_of(&live, "a"), Some(LeadStatus::Contacted));
        assert_eq!(signal.current().map(|d| d.target_id), Some("a".to_string()));
    }
}
