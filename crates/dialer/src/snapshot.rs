//! Target queue snapshot
//!
//! The live lead list is edited by everyone: CRUD screens, CSV imports, and
//! the status updates that follow every call this sequencer places. A session
//! therefore never iterates the live list. It captures a `TargetQueue` once at
//! start and indexes into that for its whole lifetime.

use std::cmp::Ordering;
use std::sync::Arc;

use powerdial_protocol::{LeadStatus, Target};
use serde::{Deserialize, Serialize};

/// Order applied to the captured queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueOrder {
    /// Keep the live list's order
    #[default]
    AsListed,
    /// Case-insensitive by lead name
    Name,
    /// Case-insensitive by company, leads without one last
    Company,
}

/// Which leads a session captures, and in what order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QueuePolicy {
    /// Only capture leads in one of these statuses. `None` captures everything.
    pub include_statuses: Option<Vec<LeadStatus>>,
    pub order: QueueOrder,
}

impl QueuePolicy {
    pub fn includes(&self, target: &Target) -> bool {
        self.include_statuses
            .as_ref()
            .is_none_or(|statuses| statuses.contains(&target.status))
    }
}

/// Immutable, ordered capture of targets.
///
/// Clones share the same backing slice.
#[derive(Debug, Clone, Default)]
pub struct TargetQueue {
    targets: Arc<[Target]>,
}

impl TargetQueue {
    /// Copy the live list's current contents and order.
    pub fn capture(live: &[Target], policy: &QueuePolicy) -> Self {
        let mut targets: Vec<Target> = live
            .iter()
            .filter(|t| policy.includes(t))
            .cloned()
            .collect();

        // sort_by is stable, so ties keep live-list order
        match policy.order {
            QueueOrder::AsListed => {}
            QueueOrder::Name => targets.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name)),
            QueueOrder::Company => targets.sort_by(|a, b| match (&a.company, &b.company) {
                (Some(x), Some(y)) => cmp_ignore_case(x, y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }),
        }

        Self {
            targets: targets.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Target> {
        self.targets.get(index)
    }

    /// Index of the target with this id, if it was captured.
    pub fn position(&self, target_id: &str) -> Option<usize> {
        self.targets.iter().position(|t| t.id == target_id)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.targets.len().checked_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
