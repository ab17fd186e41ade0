//! Structured pass diagnostics.
//!
//! A reconciliation pass never fails as a whole. Per-entry problems are
//! collected into a stable, JSON-serializable format that the host can
//! surface without access to Rust logs.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassDiagnosticKind {
    /// A `color` that is not `#RRGGBB`. The entry's color step was skipped.
    MalformedColor,
    /// The same id appears more than once in the desired state.
    DuplicateId,
    /// The entity is not (yet) in the scene. Retried on the next pass.
    UnresolvedEntity,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PassDiagnostic {
    pub kind: PassDiagnosticKind,
    pub id: String,
    pub message: String,
}

impl PassDiagnostic {
    pub fn malformed_color(id: &str, color: &str) -> Self {
        Self {
            kind: PassDiagnosticKind::MalformedColor,
            id: id.to_string(),
            message: format!("malformed color '{}', expected #RRGGBB", color),
        }
    }

    pub fn duplicate_id(id: &str, occurrences: usize) -> Self {
        Self {
            kind: PassDiagnosticKind::DuplicateId,
            id: id.to_string(),
            message: format!("id appears {} times in desired state", occurrences),
        }
    }

    pub fn unresolved(id: &str) -> Self {
        Self {
            kind: PassDiagnosticKind::UnresolvedEntity,
            id: id.to_string(),
            message: "entity not found in scene".to_string(),
        }
    }

    /// Whether the host should hear about this at warning level.
    /// Unresolved entities are expected before a model finishes loading.
    pub fn is_warning(&self) -> bool {
        !matches!(self.kind, PassDiagnosticKind::UnresolvedEntity)
    }
}
