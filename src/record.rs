//! Normalized message records.
//!
//! This module provides [`MessageRecord`], the immutable representation of
//! one SMS, MMS, call or voicemail entry after participant resolution. The
//! fragment parser emits raw records; the engine resolves them into this
//! type before any grouping, filtering or counting happens, so everything
//! downstream of the parser boundary works on tagged variants instead of
//! markup.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use voicepack::phone::PhoneNumber;
//! use voicepack::record::{Direction, MessageRecord, RecordKind};
//!
//! let own = PhoneNumber::normalize("+15550100100")?;
//! let them = PhoneNumber::normalize("+15550100200")?;
//!
//! let msg = MessageRecord::new(
//!     RecordKind::Sms,
//!     Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
//!     Direction::Sent,
//!     own,
//!     them,
//!     "On my way",
//! );
//! assert_eq!(msg.kind, RecordKind::Sms);
//! # Ok::<(), voicepack::VoicepackError>(())
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phone::{PhoneNumber, fnv1a64};

/// The kind of history entry a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Sms,
    Mms,
    Call,
    Voicemail,
}

/// Message direction relative to the account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
}

/// Media category of a resolved attachment. Drives the per-conversation
/// media counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Vcard,
}

/// An attachment reference carried by a message.
///
/// Built once by the attachment mapper and read-only afterward. A `None`
/// resolved path marks an orphan token: the export referenced a file the
/// attachments directory doesn't contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// The raw token as it appeared in the fragment markup.
    pub token: String,

    /// The on-disk file this token mapped to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub resolved_path: Option<PathBuf>,

    /// Media category, when the token or file carried a recognizable type.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

impl AttachmentRef {
    /// Returns `true` when the token mapped to a real file.
    pub fn is_resolved(&self) -> bool {
        self.resolved_path.is_some()
    }
}

/// One resolved history entry. Immutable once created.
///
/// # Fields
///
/// | Field | Description |
/// |-------|-------------|
/// | `kind` | SMS, MMS, call or voicemail |
/// | `timestamp` | When the entry occurred |
/// | `direction` | Sent or received, relative to the account holder |
/// | `sender` | Attributed author (own number when sent, a member in groups) |
/// | `counterpart` | Resolved other party; in groups, the attributed member |
/// | `body` | Text content, or call/voicemail metadata |
/// | `attachments` | Resolved attachment references |
/// | `dedup_key` | Stable content fingerprint for cross-fragment dedup |
/// | `fragment_seq` | Discovery order of the source fragment |
/// | `intra_index` | Position within the source fragment |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub kind: RecordKind,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub sender: PhoneNumber,
    pub counterpart: PhoneNumber,
    pub body: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    #[serde(skip)]
    pub dedup_key: u64,
    #[serde(skip)]
    pub fragment_seq: u64,
    #[serde(skip)]
    pub intra_index: u32,
}

impl MessageRecord {
    /// Creates a record with no attachments and default provenance.
    ///
    /// The dedup key is computed at construction and never changes.
    pub fn new(
        kind: RecordKind,
        timestamp: DateTime<Utc>,
        direction: Direction,
        sender: PhoneNumber,
        counterpart: PhoneNumber,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        let dedup_key = dedup_key(timestamp, &counterpart, &body, &[]);
        Self {
            kind,
            timestamp,
            direction,
            sender,
            counterpart,
            body,
            attachments: Vec::new(),
            dedup_key,
            fragment_seq: 0,
            intra_index: 0,
        }
    }

    /// Builder method to attach resolved attachment references.
    ///
    /// Recomputes the dedup key: two copies of the same MMS must fingerprint
    /// identically even when one fragment lists the attachment tokens.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<AttachmentRef>) -> Self {
        self.attachments = attachments;
        self.dedup_key = dedup_key(
            self.timestamp,
            &self.counterpart,
            &self.body,
            &self.attachments,
        );
        self
    }

    /// Builder method to record where this message came from.
    ///
    /// Provenance breaks timestamp ties during finalization; it does not
    /// participate in the dedup key, so the same message found in two
    /// overlapping fragments still collapses to one.
    #[must_use]
    pub fn with_provenance(mut self, fragment_seq: u64, intra_index: u32) -> Self {
        self.fragment_seq = fragment_seq;
        self.intra_index = intra_index;
        self
    }

    /// Returns the number of attachments that mapped to real files.
    pub fn resolved_attachment_count(&self) -> usize {
        self.attachments.iter().filter(|a| a.is_resolved()).count()
    }
}

/// Stable fingerprint of (timestamp, counterpart, content).
///
/// FNV-1a over the raw parts, so the key is identical across runs,
/// platforms and fragment dispatch orders.
fn dedup_key(
    timestamp: DateTime<Utc>,
    counterpart: &PhoneNumber,
    body: &str,
    attachments: &[AttachmentRef],
) -> u64 {
    let mut bytes = Vec::with_capacity(32 + body.len());
    bytes.extend_from_slice(&timestamp.timestamp_millis().to_le_bytes());
    bytes.push(0);
    bytes.extend_from_slice(counterpart.as_str().as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(body.as_bytes());
    for att in attachments {
        bytes.push(0);
        bytes.extend_from_slice(att.token.as_bytes());
    }
    fnv1a64(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn num(s: &str) -> PhoneNumber {
        PhoneNumber::normalize(s).unwrap()
    }

    fn sample(ts_secs: u32, body: &str) -> MessageRecord {
        MessageRecord::new(
            RecordKind::Sms,
            Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, ts_secs).unwrap(),
            Direction::Received,
            num("+15550100200"),
            num("+15550100200"),
            body,
        )
    }

    #[test]
    fn test_dedup_key_stable_across_fragments() {
        let a = sample(0, "hello").with_provenance(1, 5);
        let b = sample(0, "hello").with_provenance(7, 0);
        assert_eq!(a.dedup_key, b.dedup_key);
    }

    #[test]
    fn test_dedup_key_differs_by_content() {
        assert_ne!(sample(0, "hello").dedup_key, sample(0, "world").dedup_key);
        assert_ne!(sample(0, "hello").dedup_key, sample(1, "hello").dedup_key);
    }

    #[test]
    fn test_dedup_key_differs_by_counterpart() {
        let a = sample(0, "hello");
        let mut b = MessageRecord::new(
            RecordKind::Sms,
            a.timestamp,
            Direction::Received,
            num("+15550100300"),
            num("+15550100300"),
            "hello",
        );
        b = b.with_provenance(0, 0);
        assert_ne!(a.dedup_key, b.dedup_key);
    }

    #[test]
    fn test_attachments_change_key() {
        let plain = sample(0, "");
        let with_att = sample(0, "").with_attachments(vec![AttachmentRef {
            token: "photo-1-1".into(),
            resolved_path: None,
            media_type: Some(MediaType::Image),
        }]);
        assert_ne!(plain.dedup_key, with_att.dedup_key);
    }

    #[test]
    fn test_resolved_attachment_count() {
        let msg = sample(0, "").with_attachments(vec![
            AttachmentRef {
                token: "a".into(),
                resolved_path: Some("a.jpg".into()),
                media_type: Some(MediaType::Image),
            },
            AttachmentRef {
                token: "b".into(),
                resolved_path: None,
                media_type: None,
            },
        ]);
        assert_eq!(msg.resolved_attachment_count(), 1);
    }

    #[test]
    fn test_serialization_skips_empty() {
        let msg = sample(0, "hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"sms\""));
        assert!(!json.contains("attachments"));
        assert!(!json.contains("dedup_key"));
    }
}
