//! Phone number normalization and conversation identity.
//!
//! Every participant reference in an export — `tel:` hrefs, filename
//! prefixes, bare digit runs — is normalized into a [`PhoneNumber`] before
//! any grouping or filtering sees it. Conversation identity is then a pure
//! function of the normalized, sorted participant set, so the same physical
//! conversation always maps to the same [`ConversationId`] no matter which
//! fragment is discovered first.
//!
//! # Examples
//!
//! ```
//! use voicepack::phone::PhoneNumber;
//!
//! let a = PhoneNumber::normalize("(555) 010-0200")?;
//! let b = PhoneNumber::normalize("+15550100200")?;
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "+15550100200");
//! # Ok::<(), voicepack::VoicepackError>(())
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VoicepackError;

/// Prefix for deterministic synthetic placeholder numbers.
///
/// `+000` is not a valid E.164 country code, so a synthetic number can
/// never collide with a real counterpart.
const SYNTHETIC_PREFIX: &str = "+000";

/// Distinguished placeholder for a group message whose sender token could
/// not be attributed to any known participant.
const UNKNOWN_MEMBER: &str = "+000000000000";

/// North American toll-free area codes.
const TOLL_FREE_AREA_CODES: [&str; 8] = [
    "800", "833", "844", "855", "866", "877", "888", "822",
];

/// A normalized phone number.
///
/// Real numbers are stored in E.164 form (`+15550100200`). Short codes
/// (3–6 digit service numbers) keep their bare digits. Synthetic fallback
/// numbers and the unknown-member placeholder live in the reserved `+000`
/// namespace and are never conflated with real numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalizes a raw token to E.164.
    ///
    /// Accepts common US notations (`(555) 010-0200`, `555.010.0200`,
    /// `1-555-010-0200`, `+15550100200`) and bare short codes (`22395`).
    ///
    /// # Errors
    ///
    /// Returns [`VoicepackError::InvalidPhoneNumber`] when the token has no
    /// plausible digit run.
    pub fn normalize(token: &str) -> Result<Self, VoicepackError> {
        let trimmed = token.trim();
        let has_plus = trimmed.starts_with('+');
        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

        let canonical = match digits.len() {
            0 => {
                return Err(VoicepackError::InvalidPhoneNumber {
                    input: token.to_string(),
                });
            }
            // Short codes stay bare; they are not E.164 numbers.
            3..=6 if !has_plus => digits,
            10 if !has_plus => format!("+1{digits}"),
            11 if !has_plus && digits.starts_with('1') => format!("+{digits}"),
            7..=15 if has_plus => format!("+{digits}"),
            _ => {
                return Err(VoicepackError::InvalidPhoneNumber {
                    input: token.to_string(),
                });
            }
        };

        Ok(Self(canonical))
    }

    /// Scans free text (a sender token, a `tel:` href, a filename) for the
    /// first normalizable phone number.
    ///
    /// Returns `None` when no digit run in the text normalizes.
    pub fn extract(text: &str) -> Option<Self> {
        let mut run = String::new();
        let mut runs: Vec<String> = Vec::new();

        for ch in text.chars() {
            if ch.is_ascii_digit() || (run.is_empty() && ch == '+') {
                run.push(ch);
            } else if matches!(ch, '-' | '.' | ' ' | '(' | ')') && !run.is_empty() {
                // Separator inside a formatted number; keep scanning.
                continue;
            } else if !run.is_empty() {
                runs.push(std::mem::take(&mut run));
            }
        }
        if !run.is_empty() {
            runs.push(run);
        }

        runs.iter().find_map(|r| Self::normalize(r).ok())
    }

    /// Derives the deterministic synthetic fallback number for a fragment
    /// that resolved to no real counterpart.
    ///
    /// The result is a pure function of the inputs: the same fragment always
    /// produces the same placeholder, across runs and dispatch orders.
    pub fn synthetic(filename: &str, fragment_seq: u64) -> Self {
        let mut seed = filename.as_bytes().to_vec();
        seed.extend_from_slice(&fragment_seq.to_le_bytes());
        let digits = fnv1a64(&seed) % 1_000_000_000;
        Self(format!("{SYNTHETIC_PREFIX}{digits:09}"))
    }

    /// Returns the placeholder for an unattributable group sender.
    pub fn unknown_member() -> Self {
        Self(UNKNOWN_MEMBER.to_string())
    }

    /// Returns `true` for synthetic placeholders (including the
    /// unknown-member placeholder).
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_PREFIX)
    }

    /// Returns `true` for the unknown-group-member placeholder.
    pub fn is_unknown_member(&self) -> bool {
        self.0 == UNKNOWN_MEMBER
    }

    /// Returns `true` for bare short codes (3–6 digit service numbers).
    pub fn is_short_code(&self) -> bool {
        !self.0.starts_with('+') && self.0.len() <= 6
    }

    /// Returns `true` for North American toll-free numbers.
    pub fn is_toll_free(&self) -> bool {
        self.0
            .strip_prefix("+1")
            .is_some_and(|rest| TOLL_FREE_AREA_CODES.iter().any(|ac| rest.starts_with(ac)))
    }

    /// Returns `true` for non-personal numbers: short codes and toll-free
    /// ranges. These are excluded by the default filter configuration.
    pub fn is_service_code(&self) -> bool {
        self.is_short_code() || self.is_toll_free()
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of non-own participants in a conversation.
///
/// Order-independent for identity; iteration is always in canonical sorted
/// order, which is what [`ConversationId`] joins over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantSet(BTreeSet<PhoneNumber>);

impl ParticipantSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw numbers, excluding `own`.
    pub fn from_numbers<I>(numbers: I, own: &PhoneNumber) -> Self
    where
        I: IntoIterator<Item = PhoneNumber>,
    {
        Self(numbers.into_iter().filter(|n| n != own).collect())
    }

    /// Inserts a participant. The own number must be excluded by the caller.
    pub fn insert(&mut self, number: PhoneNumber) {
        self.0.insert(number);
    }

    /// Returns `true` if `number` is a member.
    pub fn contains(&self, number: &PhoneNumber) -> bool {
        self.0.contains(number)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates members in canonical sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &PhoneNumber> {
        self.0.iter()
    }

    /// Joins members in canonical sorted order with `,`.
    pub fn canonical_join(&self) -> String {
        self.0
            .iter()
            .map(PhoneNumber::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<PhoneNumber> for ParticipantSet {
    fn from_iter<I: IntoIterator<Item = PhoneNumber>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Deterministic conversation identity.
///
/// `(isGroup ? "G_" : "I_") + sortedJoin(participants)` — a pure function
/// of the group flag and the participant set, invariant under fragment
/// discovery order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Computes the id for a participant set.
    pub fn new(is_group: bool, participants: &ParticipantSet) -> Self {
        let prefix = if is_group { "G_" } else { "I_" };
        Self(format!("{prefix}{}", participants.canonical_join()))
    }

    pub fn is_group(&self) -> bool {
        self.0.starts_with("G_")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// FNV-1a, 64-bit. Used for dedup keys and synthetic number derivation,
/// where stability across runs and platforms matters (the std hasher
/// guarantees neither).
pub(crate) fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
