//! Concurrent-update conflict detection and resolution strategies.
//!
//! Detection is a wall-clock heuristic: a project material counted as
//! "in conflict" when its `updated_at` falls inside a fixed window before
//! now. This is a proxy for "recently touched by someone else", not a
//! version/ETag check; the window and `now` are parameters so the decision
//! stays a pure function.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// How a detected conflict is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// The dispatch-side update always proceeds.
    LastWriteWins,
    /// The update proceeds but only dispatch-owned fields are overwritten;
    /// free-text notes are concatenated, and project-maintained optional
    /// fields already set on the record are left alone.
    Merge,
    /// The update is refused and the material counted as skipped; a flagged
    /// record is logged for a human to review.
    Manual,
}

/// Outcome of resolving a conflict for one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    /// Apply the update under the given merge policy.
    Apply(MergePolicy),
    /// Skip the material.
    Refuse,
}

/// Which fields an update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// All dispatch-authoritative fields, including optional ones the
    /// project side may have filled in.
    #[default]
    Full,
    /// Dispatch-owned fields only: optional fields (cost, location) already
    /// set on the project record are preserved.
    DispatchFieldsOnly,
}

/// True when `updated_at` lies within `window` before `now`.
pub fn detect_conflict(updated_at: Timestamp, now: Timestamp, window: Duration) -> bool {
    let age = now - updated_at;
    age >= Duration::zero() && age < window
}

/// Decide whether a conflicting update proceeds.
pub fn resolve(strategy: ConflictStrategy) -> ConflictDecision {
    match strategy {
        ConflictStrategy::LastWriteWins => ConflictDecision::Apply(MergePolicy::Full),
        ConflictStrategy::Merge => ConflictDecision::Apply(MergePolicy::DispatchFieldsOnly),
        ConflictStrategy::Manual => ConflictDecision::Refuse,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    const WINDOW: i64 = 300;

    #[test]
    fn recent_update_is_a_conflict() {
        let now = Utc::now();
        let updated = now - Duration::seconds(60);
        assert!(detect_conflict(updated, now, Duration::seconds(WINDOW)));
    }

    #[test]
    fn old_update_is_not_a_conflict() {
        let now = Utc::now();
        let updated = now - Duration::seconds(WINDOW + 1);
        assert!(!detect_conflict(updated, now, Duration::seconds(WINDOW)));
    }

    #[test]
    fn update_exactly_at_window_edge_is_not_a_conflict() {
        let now = Utc::now();
        let updated = now - Duration::seconds(WINDOW);
        assert!(!detect_conflict(updated, now, Duration::seconds(WINDOW)));
    }

    #[test]
    fn future_timestamp_is_not_a_conflict() {
        // Clock skew: a record "from the future" is not treated as touched.
        let now = Utc::now();
        let updated = now + Duration::seconds(10);
        assert!(!detect_conflict(updated, now, Duration::seconds(WINDOW)));
    }

    #[test]
    fn last_write_wins_applies_fully() {
        assert_eq!(
            resolve(ConflictStrategy::LastWriteWins),
            ConflictDecision::Apply(MergePolicy::Full)
        );
    }

    #[test]
    fn merge_applies_with_constrained_fields() {
        assert_eq!(
            resolve(ConflictStrategy::Merge),
            ConflictDecision::Apply(MergePolicy::DispatchFieldsOnly)
        );
    }

    #[test]
    fn manual_refuses() {
        assert_eq!(resolve(ConflictStrategy::Manual), ConflictDecision::Refuse);
    }
}
