//! Status vocabularies for both record sets and the mapping between them.
//!
//! Dispatch materials and project materials carry different status enums.
//! The forward map (dispatch -> project) is total and merging: `Arrived` and
//! `Allocated` both collapse to `Delivered`, and `Damaged` maps to
//! `Delivered` with the damage carried in free-text notes rather than the
//! enum. The inverse map is therefore lossy, and round-tripping a status
//! through both maps is NOT guaranteed to return the original value. That is
//! intentional; do not "fix" it.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Delivery/usage status of one shipped line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchMaterialStatus {
    Pending,
    Arrived,
    Allocated,
    Used,
    /// Side branch: damaged goods leave the normal progression entirely.
    Damaged,
}

/// Tracking status of a project's material instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectMaterialStatus {
    Required,
    Ordered,
    Delivered,
    Installed,
}

// ---------------------------------------------------------------------------
// Forward / inverse maps
// ---------------------------------------------------------------------------

/// Map a dispatch status onto the project-side vocabulary.
///
/// Total over every [`DispatchMaterialStatus`] value. Merging, not injective:
/// `Arrived` and `Allocated` are intentionally collapsed to `Delivered`.
/// `Damaged` also lands on `Delivered`; the damage flag travels in notes.
pub fn to_project_status(status: DispatchMaterialStatus) -> ProjectMaterialStatus {
    match status {
        DispatchMaterialStatus::Pending => ProjectMaterialStatus::Ordered,
        DispatchMaterialStatus::Arrived => ProjectMaterialStatus::Delivered,
        DispatchMaterialStatus::Allocated => ProjectMaterialStatus::Delivered,
        DispatchMaterialStatus::Used => ProjectMaterialStatus::Installed,
        DispatchMaterialStatus::Damaged => ProjectMaterialStatus::Delivered,
    }
}

/// Map a project status back onto the dispatch-side vocabulary.
///
/// Lossy inverse of [`to_project_status`]: `Delivered` always yields
/// `Arrived` even when the dispatch side was `Allocated` or `Damaged`.
pub fn to_dispatch_status(status: ProjectMaterialStatus) -> DispatchMaterialStatus {
    match status {
        ProjectMaterialStatus::Required => DispatchMaterialStatus::Pending,
        ProjectMaterialStatus::Ordered => DispatchMaterialStatus::Pending,
        ProjectMaterialStatus::Delivered => DispatchMaterialStatus::Arrived,
        ProjectMaterialStatus::Installed => DispatchMaterialStatus::Used,
    }
}

// ---------------------------------------------------------------------------
// Ordinal ranks and the regression guard
// ---------------------------------------------------------------------------

impl DispatchMaterialStatus {
    /// Position in the forward-only progression.
    ///
    /// `Damaged` is an unranked side branch and returns `None`.
    pub fn rank(self) -> Option<u8> {
        match self {
            DispatchMaterialStatus::Pending => Some(0),
            DispatchMaterialStatus::Arrived => Some(1),
            DispatchMaterialStatus::Allocated => Some(2),
            DispatchMaterialStatus::Used => Some(3),
            DispatchMaterialStatus::Damaged => None,
        }
    }

    /// Whether `candidate` may replace `self` under the default
    /// forward-only policy.
    ///
    /// Ranked statuses advance only to a strictly higher rank. `Damaged` may
    /// be entered from any ranked status except terminal `Used`, and once a
    /// material is `Used` or `Damaged` nothing further applies.
    pub fn advances_to(self, candidate: DispatchMaterialStatus) -> bool {
        match (self.rank(), candidate.rank()) {
            (Some(current), Some(next)) => next > current,
            // Entering the damage side branch.
            (Some(current), None) => current < 3,
            // Damaged is effectively terminal.
            (None, _) => false,
        }
    }
}

impl ProjectMaterialStatus {
    /// Position in the forward-only progression.
    pub fn rank(self) -> u8 {
        match self {
            ProjectMaterialStatus::Required => 0,
            ProjectMaterialStatus::Ordered => 1,
            ProjectMaterialStatus::Delivered => 2,
            ProjectMaterialStatus::Installed => 3,
        }
    }

    /// Whether `candidate` may replace `self` under the default
    /// forward-only policy.
    pub fn advances_to(self, candidate: ProjectMaterialStatus) -> bool {
        candidate.rank() > self.rank()
    }
}

/// Decide the status to apply given the regression guard.
///
/// Returns `Some(candidate)` when the candidate advances past `current` (or
/// `force` is set), `None` when the guard holds and the current status must
/// be kept.
pub fn guarded_project_status(
    current: ProjectMaterialStatus,
    candidate: ProjectMaterialStatus,
    force: bool,
) -> Option<ProjectMaterialStatus> {
    if force || current.advances_to(candidate) {
        Some(candidate)
    } else {
        None
    }
}

/// Dispatch-side counterpart of [`guarded_project_status`].
pub fn guarded_dispatch_status(
    current: DispatchMaterialStatus,
    candidate: DispatchMaterialStatus,
    force: bool,
) -> Option<DispatchMaterialStatus> {
    if force || current.advances_to(candidate) {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_DISPATCH: [DispatchMaterialStatus; 5] = [
        DispatchMaterialStatus::Pending,
        DispatchMaterialStatus::Arrived,
        DispatchMaterialStatus::Allocated,
        DispatchMaterialStatus::Used,
        DispatchMaterialStatus::Damaged,
    ];

    // -----------------------------------------------------------------------
    // Forward map pairs
    // -----------------------------------------------------------------------

    #[test]
    fn pending_maps_to_ordered() {
        assert_eq!(
            to_project_status(DispatchMaterialStatus::Pending),
            ProjectMaterialStatus::Ordered
        );
    }

    #[test]
    fn arrived_maps_to_delivered() {
        assert_eq!(
            to_project_status(DispatchMaterialStatus::Arrived),
            ProjectMaterialStatus::Delivered
        );
    }

    #[test]
    fn allocated_maps_to_delivered() {
        assert_eq!(
            to_project_status(DispatchMaterialStatus::Allocated),
            ProjectMaterialStatus::Delivered
        );
    }

    #[test]
    fn used_maps_to_installed() {
        assert_eq!(
            to_project_status(DispatchMaterialStatus::Used),
            ProjectMaterialStatus::Installed
        );
    }

    #[test]
    fn damaged_maps_to_delivered() {
        assert_eq!(
            to_project_status(DispatchMaterialStatus::Damaged),
            ProjectMaterialStatus::Delivered
        );
    }

    #[test]
    fn forward_map_is_total() {
        // Every dispatch status produces a project status without panicking.
        for status in ALL_DISPATCH {
            let _ = to_project_status(status);
        }
    }

    // -----------------------------------------------------------------------
    // Inverse map pairs
    // -----------------------------------------------------------------------

    #[test]
    fn required_maps_to_pending() {
        assert_eq!(
            to_dispatch_status(ProjectMaterialStatus::Required),
            DispatchMaterialStatus::Pending
        );
    }

    #[test]
    fn ordered_maps_to_pending() {
        assert_eq!(
            to_dispatch_status(ProjectMaterialStatus::Ordered),
            DispatchMaterialStatus::Pending
        );
    }

    #[test]
    fn delivered_maps_to_arrived() {
        assert_eq!(
            to_dispatch_status(ProjectMaterialStatus::Delivered),
            DispatchMaterialStatus::Arrived
        );
    }

    #[test]
    fn installed_maps_to_used() {
        assert_eq!(
            to_dispatch_status(ProjectMaterialStatus::Installed),
            DispatchMaterialStatus::Used
        );
    }

    #[test]
    fn round_trip_is_lossy_for_allocated() {
        // Allocated -> Delivered -> Arrived. Documented, intentional.
        let round = to_dispatch_status(to_project_status(DispatchMaterialStatus::Allocated));
        assert_eq!(round, DispatchMaterialStatus::Arrived);
    }

    // -----------------------------------------------------------------------
    // Regression guard: project side
    // -----------------------------------------------------------------------

    #[test]
    fn delivered_advances_to_installed() {
        assert!(ProjectMaterialStatus::Delivered.advances_to(ProjectMaterialStatus::Installed));
    }

    #[test]
    fn installed_never_downgrades() {
        for candidate in [
            ProjectMaterialStatus::Required,
            ProjectMaterialStatus::Ordered,
            ProjectMaterialStatus::Delivered,
        ] {
            assert!(!ProjectMaterialStatus::Installed.advances_to(candidate));
        }
    }

    #[test]
    fn equal_rank_does_not_advance() {
        assert!(!ProjectMaterialStatus::Delivered.advances_to(ProjectMaterialStatus::Delivered));
    }

    #[test]
    fn force_overrides_project_guard() {
        assert_eq!(
            guarded_project_status(
                ProjectMaterialStatus::Installed,
                ProjectMaterialStatus::Delivered,
                true,
            ),
            Some(ProjectMaterialStatus::Delivered)
        );
    }

    #[test]
    fn guard_holds_without_force() {
        assert_eq!(
            guarded_project_status(
                ProjectMaterialStatus::Installed,
                ProjectMaterialStatus::Delivered,
                false,
            ),
            None
        );
    }

    // -----------------------------------------------------------------------
    // Regression guard: dispatch side
    // -----------------------------------------------------------------------

    #[test]
    fn pending_advances_to_arrived() {
        assert!(DispatchMaterialStatus::Pending.advances_to(DispatchMaterialStatus::Arrived));
    }

    #[test]
    fn used_is_terminal() {
        for candidate in ALL_DISPATCH {
            assert!(!DispatchMaterialStatus::Used.advances_to(candidate));
        }
    }

    #[test]
    fn damaged_is_terminal() {
        for candidate in ALL_DISPATCH {
            assert!(!DispatchMaterialStatus::Damaged.advances_to(candidate));
        }
    }

    #[test]
    fn arrived_can_enter_damage_branch() {
        assert!(DispatchMaterialStatus::Arrived.advances_to(DispatchMaterialStatus::Damaged));
    }

    #[test]
    fn used_cannot_enter_damage_branch() {
        assert!(!DispatchMaterialStatus::Used.advances_to(DispatchMaterialStatus::Damaged));
    }

    #[test]
    fn force_overrides_dispatch_guard() {
        assert_eq!(
            guarded_dispatch_status(
                DispatchMaterialStatus::Used,
                DispatchMaterialStatus::Pending,
                true,
            ),
            Some(DispatchMaterialStatus::Pending)
        );
    }
}
