// ── Run report ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::outcome::ActionOutcome;

/// Ordered outcomes of one invocation.
///
/// Counts are derived from the outcomes on demand and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The run was cancelled before every planned outcome was produced.
    pub cancelled: bool,
    outcomes: Vec<ActionOutcome>,
}

impl RunReport {
    pub(crate) fn new(
        started_at: DateTime<Utc>,
        outcomes: Vec<ActionOutcome>,
        cancelled: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            cancelled,
            outcomes,
        }
    }

    /// A report with no outcomes, for runs with no eligible devices.
    pub fn empty() -> Self {
        Self::new(Utc::now(), Vec::new(), false)
    }

    pub fn outcomes(&self) -> &[ActionOutcome] {
        &self.outcomes
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Whether every outcome passed. Vacuously true for an empty report.
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(ActionOutcome::is_passed)
    }

    /// Outcomes for one device, in recording order.
    pub fn for_device<'a>(&'a self, serial: &'a str) -> impl Iterator<Item = &'a ActionOutcome> + 'a {
        self.outcomes.iter().filter(move |o| o.serial() == serial)
    }
}
