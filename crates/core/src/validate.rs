//! Physical-specification compatibility check between a dispatch material
//! and a candidate project material.
//!
//! Findings are field-scoped and carry a severity; an `Error` finding means
//! the caller must skip that one material, never the whole batch.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::{DispatchMaterial, ProjectMaterial};

/// Severity of a single validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One field-level mismatch between the two specifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub expected: String,
    pub actual: String,
    pub severity: Severity,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, expected: String, actual: String, severity: Severity) -> Self {
        Self {
            field: field.into(),
            expected,
            actual,
            severity,
        }
    }
}

/// Toggles and tolerance for the compatibility check.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaterialMatchCriteria {
    pub match_type: bool,
    pub match_profile: bool,
    pub match_grade: bool,
    pub match_dimensions: bool,
    /// Per-dimension tolerance as a percentage of the project-side value.
    #[validate(range(min = 0.0, max = 100.0))]
    pub tolerance_percent: f64,
}

impl Default for MaterialMatchCriteria {
    fn default() -> Self {
        Self {
            match_type: true,
            match_profile: true,
            match_grade: true,
            match_dimensions: true,
            tolerance_percent: 5.0,
        }
    }
}

/// Compare a dispatch material against an existing project material.
///
/// Material-type and profile mismatches are errors; grade mismatch is a
/// warning. For each dimension key present on BOTH sides the delta is banded
/// against `tolerance = |project value| * tolerance_percent / 100`:
/// delta <= tolerance is fine, delta <= 2x tolerance is a warning, anything
/// beyond is an error. Keys missing on either side are silently skipped.
pub fn check_compatibility(
    dispatch: &DispatchMaterial,
    project: &ProjectMaterial,
    criteria: &MaterialMatchCriteria,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if criteria.match_type && !text_matches(&dispatch.material_type, &project.material_type) {
        issues.push(ValidationIssue::new(
            "materialType",
            project.material_type.clone(),
            dispatch.material_type.clone(),
            Severity::Error,
        ));
    }

    if criteria.match_profile && !text_matches(&dispatch.profile, &project.profile) {
        issues.push(ValidationIssue::new(
            "profile",
            project.profile.clone(),
            dispatch.profile.clone(),
            Severity::Error,
        ));
    }

    if criteria.match_grade && !text_matches(&dispatch.grade, &project.grade) {
        issues.push(ValidationIssue::new(
            "grade",
            project.grade.clone(),
            dispatch.grade.clone(),
            Severity::Warning,
        ));
    }

    if criteria.match_dimensions {
        for (key, project_value) in &project.dimensions {
            let Some(dispatch_value) = dispatch.dimensions.get(key) else {
                continue;
            };
            let tolerance = project_value.abs() * criteria.tolerance_percent / 100.0;
            let delta = (dispatch_value - project_value).abs();

            let severity = if delta > 2.0 * tolerance {
                Severity::Error
            } else if delta > tolerance {
                Severity::Warning
            } else {
                continue;
            };
            issues.push(ValidationIssue::new(
                format!("dimensions.{key}"),
                project_value.to_string(),
                dispatch_value.to_string(),
                severity,
            ));
        }
    }

    issues
}

/// Whether any finding blocks the material (severity error).
pub fn has_blocking_issue(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

/// Specification text comparison: trimmed, ASCII case-insensitive.
fn text_matches(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
