//! Structured run diagnostics.
//!
//! Per-fragment and per-message problems never abort a run; they are
//! recorded here as [`Warning`] values and surfaced to the caller once the
//! run finishes. The sink is shared by all workers, so recording is
//! thread-safe; reading happens after the pool drains.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use crate::phone::PhoneNumber;

/// One recoverable problem encountered during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A fragment failed to parse and was skipped entirely.
    SkippedFragment { path: PathBuf, reason: String },

    /// An attachment token matched no file in the attachments directory.
    OrphanAttachment { token: String, fragment: String },

    /// No real counterpart could be resolved; a synthetic placeholder
    /// number was assigned.
    LowConfidenceResolution {
        fragment: String,
        placeholder: PhoneNumber,
    },

    /// A group message's sender token matched no known participant; the
    /// message was attributed to the unknown-member placeholder.
    UnknownGroupSender { fragment: String },
}

/// Thread-safe warning sink shared across workers.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Mutex<Vec<Warning>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one warning.
    pub fn record(&self, warning: Warning) {
        self.warnings.lock().expect("diagnostics lock").push(warning);
    }

    /// Consumes the sink and returns all warnings in recording order.
    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings.into_inner().expect("diagnostics lock")
    }

    /// Returns a snapshot of the warnings recorded so far.
    pub fn snapshot(&self) -> Vec<Warning> {
        self.warnings.lock().expect("diagnostics lock").clone()
    }
}

/// Aggregated warning counts for the end-of-run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSummary {
    pub skipped_fragments: usize,
    pub orphan_attachments: usize,
    pub low_confidence_resolutions: usize,
    pub unknown_group_senders: usize,
}

impl DiagnosticsSummary {
    /// Tallies a warning list.
    pub fn from_warnings(warnings: &[Warning]) -> Self {
        let mut summary = Self::default();
        for warning in warnings {
            match warning {
                Warning::SkippedFragment { .. } => summary.skipped_fragments += 1,
                Warning::OrphanAttachment { .. } => summary.orphan_attachments += 1,
                Warning::LowConfidenceResolution { .. } => {
                    summary.low_confidence_resolutions += 1;
                }
                Warning::UnknownGroupSender { .. } => summary.unknown_group_senders += 1,
            }
        }
        summary
    }

    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}
