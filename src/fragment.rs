//! The raw-fragment parser boundary.
//!
//! Everything downstream of this module works on [`RawFragment`] and
//! [`RawRecord`] values; grouping, filtering and aggregation never inspect
//! markup. The engine consumes any [`FragmentParser`] implementation —
//! the shipped Takeout HTML parser ([`crate::parsers::VoiceHtmlParser`])
//! for real exports, or an in-memory one in tests.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::record::{Direction, RecordKind};

/// One unresolved history entry as the parser found it.
///
/// The sender token is the raw text the markup carried: a `tel:` href, a
/// display name, a self marker, or nothing useful at all. Resolution into a
/// [`PhoneNumber`](crate::phone::PhoneNumber) is the resolver's job.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: RecordKind,
    pub timestamp: DateTime<Utc>,

    /// Direction when the markup states it (placed vs. missed calls).
    /// `None` for texts, where direction follows from the resolved sender.
    pub direction_hint: Option<Direction>,

    /// Raw sender markup text.
    pub sender_token: String,

    /// Message text, or call/voicemail metadata (duration, transcript).
    pub body: String,

    /// Raw attachment reference tokens, unresolved.
    pub attachment_tokens: Vec<String>,
}

/// One parsed export fragment: a slice of a single conversation's history.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    /// The fragment's filename (not the full path); feeds the resolver's
    /// filename fallback and the synthetic-number derivation.
    pub filename: String,

    /// Raw participant tokens from the page-level participant list,
    /// including the account holder when the page lists them.
    pub page_participants: Vec<String>,

    /// Records in intra-fragment order.
    pub records: Vec<RawRecord>,
}

/// A parser that turns one on-disk fragment into raw records.
///
/// Implementations must be `Send + Sync`: workers parse fragments
/// concurrently, one fragment per worker.
pub trait FragmentParser: Send + Sync {
    /// Parses the fragment at `path`.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed input. The engine catches it,
    /// records a skipped-fragment warning and moves on; one bad fragment
    /// never aborts the run.
    fn parse(&self, path: &Path) -> Result<RawFragment>;
}

/// Returns `true` if a sender token is the export's self marker.
///
/// Takeout renders the account holder as a bare "Me" sender.
pub fn is_self_marker(token: &str) -> bool {
    token.trim().eq_ignore_ascii_case("me")
}
