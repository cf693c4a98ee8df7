//! Shared session state: budgets, end reasons, the finalize-once flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// The two concurrently running bounds on a sampling session. Whichever
/// is reached first ends the session; the other becomes a no-op.
#[derive(Debug, Clone, Copy)]
pub struct SessionBudget {
    pub max_duration: Duration,
    pub max_samples: usize,
}

impl Default for SessionBudget {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(10),
            max_samples: 50,
        }
    }
}

/// Which event ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// The sample-count budget filled first.
    SampleBudget,
    /// The duration budget expired first; the fallback summary applies.
    DurationBudget,
    /// Teardown before either budget; nothing is dispatched.
    Cancelled,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::SampleBudget => "SampleBudget",
            EndReason::DurationBudget => "DurationBudget",
            EndReason::Cancelled => "Cancelled",
        }
    }
}

/// First-finalizer-wins guard shared between the sampling worker and its
/// controller. Both budget timers race against the same flag; only the
/// swap that flips it gets to finalize.
#[derive(Clone, Default)]
pub struct FinalizeFlag(Arc<AtomicBool>);

impl FinalizeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true exactly once across all clones.
    pub fn try_finalize(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_finalized(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_flag_grants_exactly_one_winner() {
        let flag = FinalizeFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_finalized());
        assert!(flag.try_finalize());
        assert!(!clone.try_finalize());
        assert!(!flag.try_finalize());
        assert!(clone.is_finalized());
    }
}
