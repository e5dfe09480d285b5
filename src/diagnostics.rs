//! Collection of non-fatal anomalies encountered during a run.
//!
//! Per-struct and per-field problems degrade gracefully: the offending
//! item is skipped, the anomaly is logged and recorded here. Structural
//! failures (unreadable files, parse errors, broken templates) are
//! ordinary `Err` values instead and abort the run.

use log::warn;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A struct name was defined twice with different members.
    DuplicateStruct,
    /// A typedef alias was redefined to point at a different struct.
    DuplicateTypedef,
    /// A marker member name does not contain the reserved suffix or
    /// yields an empty owner name.
    MalformedMarker,
    /// A marker names an owner struct that was never defined in the
    /// scanned corpus.
    UnresolvedOwner,
    /// A struct declares two members with the same name.
    DuplicateField,
    /// A member shape the metadata model cannot represent.
    UnsupportedMember,
    /// Typedef resolution entered a cycle.
    TypedefCycle,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Ordered record of every anomaly reported during one run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs the anomaly and records it.
    pub fn report(&mut self, kind: DiagnosticKind, message: String) {
        warn!("{}", message);
        self.items.push(Diagnostic { kind, message });
    }

    /// Appends all entries recorded in `other`.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|item| item.kind == kind).count()
    }
}

#[test]
fn report_should_record_in_order() {
    let mut diagnostics = Diagnostics::new();
    assert!(diagnostics.is_empty());

    diagnostics.report(DiagnosticKind::DuplicateField, "first".to_string());
    diagnostics.report(DiagnosticKind::UnresolvedOwner, "second".to_string());
    diagnostics.report(DiagnosticKind::DuplicateField, "third".to_string());

    assert_eq!(diagnostics.len(), 3);
    assert_eq!(diagnostics.count_of(DiagnosticKind::DuplicateField), 2);
    assert_eq!(diagnostics.count_of(DiagnosticKind::TypedefCycle), 0);
    let messages = diagnostics
        .iter()
        .map(|item| item.message.as_str())
        .collect::<Vec<_>>();
    assert_eq!(messages, vec!["first", "second", "third"]);
}
