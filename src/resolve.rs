//! Participant resolution.
//!
//! Counterpart identity in an export fragment is often ambiguous: sender
//! markup may carry a `tel:` href, a bare display name, a self marker, or
//! nothing. [`resolve_counterpart`] runs an ordered chain of pure
//! strategies over the available context and always produces an answer;
//! the [`Resolution`] tag says which strategy won, and callers treat
//! [`Resolution::Synthetic`] as low-confidence.
//!
//! The chain is a pure function of its inputs — no shared state, no I/O —
//! so every strategy is independently testable and the outcome is
//! identical regardless of which worker runs it.
//!
//! # Priority order
//!
//! 1. Explicit phone reference in the sender markup
//! 2. (an own-number reference never settles; the chain continues)
//! 3. Sole non-own page-level participant
//! 4. Phone number or alias-registered name embedded in the filename
//! 5. Deterministic synthetic placeholder

use crate::alias::AliasLookup;
use crate::fragment::is_self_marker;
use crate::phone::PhoneNumber;

/// Which strategy produced the resolved counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Explicit phone reference in the record's sender markup.
    DirectReference,
    /// Exactly one non-own participant on the page.
    PageParticipant,
    /// Phone number embedded in the fragment filename.
    FilenameNumber,
    /// Contact name in the filename, reverse-resolved through the alias
    /// store.
    FilenameAlias,
    /// No real number found; deterministic placeholder assigned.
    Synthetic,
}

/// A resolved counterpart plus the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCounterpart {
    pub number: PhoneNumber,
    pub resolution: Resolution,
}

impl ResolvedCounterpart {
    /// Returns `true` when the number is a synthetic placeholder rather
    /// than a real counterpart.
    pub fn is_low_confidence(&self) -> bool {
        self.resolution == Resolution::Synthetic
    }
}

/// Resolves the counterpart for one record in an individual conversation.
///
/// A fragment consisting purely of outgoing messages carries only own-number
/// sender references; step 2 guarantees such a fragment never resolves its
/// conversation to the account holder.
pub fn resolve_counterpart(
    sender_token: &str,
    page_participants: &[PhoneNumber],
    filename: &str,
    fragment_seq: u64,
    own: &PhoneNumber,
    aliases: &dyn AliasLookup,
) -> ResolvedCounterpart {
    // 1. Direct reference in the sender markup. A self marker carries no
    //    counterpart information, so it doesn't even reach extraction.
    if !is_self_marker(sender_token) {
        if let Some(number) = PhoneNumber::extract(sender_token) {
            // 2. The own number never settles the chain.
            if number != *own {
                return ResolvedCounterpart {
                    number,
                    resolution: Resolution::DirectReference,
                };
            }
        }
    }

    // 3. Page-level participant list, own number excluded.
    let non_own: Vec<&PhoneNumber> = page_participants.iter().filter(|p| *p != own).collect();
    if let [sole] = non_own.as_slice() {
        return ResolvedCounterpart {
            number: (*sole).clone(),
            resolution: Resolution::PageParticipant,
        };
    }

    // 4. The filename's contact segment: an embedded number, or a name the
    //    alias store knows.
    let contact = filename_contact_segment(filename);
    if let Some(number) = PhoneNumber::extract(contact) {
        if number != *own {
            return ResolvedCounterpart {
                number,
                resolution: Resolution::FilenameNumber,
            };
        }
    } else if let Some(number) = aliases.number_for_alias(contact) {
        if number != *own {
            return ResolvedCounterpart {
                number,
                resolution: Resolution::FilenameAlias,
            };
        }
    }

    // 5. Deterministic fallback, flagged low-confidence by its tag.
    ResolvedCounterpart {
        number: PhoneNumber::synthetic(filename, fragment_seq),
        resolution: Resolution::Synthetic,
    }
}

/// Attributes a group message to its sender.
///
/// Self markers map to the own number; an explicit phone reference
/// belonging to the known participant set maps to that member; anything
/// else maps to the unknown-member placeholder. An unresolvable token must
/// never default to the own number — that would corrupt attribution for
/// every other member's messages.
pub fn attribute_group_sender(
    sender_token: &str,
    participants: &crate::phone::ParticipantSet,
    own: &PhoneNumber,
) -> PhoneNumber {
    if is_self_marker(sender_token) {
        return own.clone();
    }

    if let Some(number) = PhoneNumber::extract(sender_token) {
        if number == *own {
            return own.clone();
        }
        if participants.contains(&number) {
            return number;
        }
    }

    PhoneNumber::unknown_member()
}

/// The contact segment of a Takeout fragment filename: everything before
/// the first ` - ` separator.
fn filename_contact_segment(filename: &str) -> &str {
    filename.split(" - ").next().unwrap_or(filename).trim()
}
