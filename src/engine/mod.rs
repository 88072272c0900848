//! The conversation reconstruction engine.
//!
//! [`Engine::run`] drives the whole batch pass: fragments are assigned a
//! stable discovery order, dispatched to a fixed-size worker pool, and each
//! worker owns its fragment end-to-end — parse, resolve, group-lookup,
//! filter, append. After the pool drains, every conversation is finalized
//! exactly once and empty conversations are discarded.
//!
//! Workers block only on file reads and on the single conversation lock
//! they are appending to; the shared id map is touched briefly for
//! get-or-create. There is no ordering guarantee between workers — final
//! message order is recomputed from timestamps during finalization, so the
//! result is identical under any dispatch order.

pub mod attachments;
pub mod filter;
pub mod finalize;
pub mod grouper;

pub use attachments::AttachmentMap;
pub use filter::MessageFilter;
pub use finalize::{FinalizedConversation, finalize_all};
pub use grouper::{Conversation, ConversationHandle, ConversationMap, Counters};

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::alias::AliasLookup;
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostics, DiagnosticsSummary, Warning};
use crate::error::Result;
use crate::fragment::{FragmentParser, RawFragment, RawRecord, is_self_marker};
use crate::phone::{ParticipantSet, PhoneNumber};
use crate::record::{AttachmentRef, Direction, MessageRecord};
use crate::resolve::{attribute_group_sender, resolve_counterpart};
use grouper::page_participant_set;

/// Everything a finished run exposes to collaborators: finalized
/// conversations, exact aggregate counters and structured diagnostics.
#[derive(Debug)]
pub struct RunOutput {
    /// Surviving conversations, ordered by id.
    pub conversations: Vec<FinalizedConversation>,
    /// Aggregate counters over all surviving conversations.
    pub totals: Counters,
    /// Structured warnings in recording order.
    pub warnings: Vec<Warning>,
    /// Tallied warning counts.
    pub summary: DiagnosticsSummary,
}

/// The batch reconstruction engine.
///
/// Holds only shared read-only collaborators; all mutable state of a run
/// lives in the run itself.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::PathBuf;
/// use voicepack::alias::NoAliases;
/// use voicepack::config::EngineConfig;
/// use voicepack::engine::{AttachmentMap, Engine};
/// use voicepack::parsers::VoiceHtmlParser;
///
/// # fn main() -> voicepack::Result<()> {
/// let config = EngineConfig::new("+15550100100")?;
/// let parser = VoiceHtmlParser::new();
/// let attachments = AttachmentMap::from_dir("takeout/Calls".as_ref())?;
///
/// let engine = Engine::new(&config, &parser, &NoAliases, &attachments)?;
/// let output = engine.run(vec![PathBuf::from(
///     "takeout/Calls/+15550100200 - Text - 2024-01-15T10_30_00Z.html",
/// )]);
/// println!("{} conversations", output.conversations.len());
/// # Ok(())
/// # }
/// ```
pub struct Engine<'a> {
    config: &'a EngineConfig,
    parser: &'a dyn FragmentParser,
    aliases: &'a dyn AliasLookup,
    attachments: &'a AttachmentMap,
}

impl<'a> Engine<'a> {
    /// Creates an engine after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VoicepackError::Config`](crate::VoicepackError::Config)
    /// for contradictory configuration; nothing is processed in that case.
    pub fn new(
        config: &'a EngineConfig,
        parser: &'a dyn FragmentParser,
        aliases: &'a dyn AliasLookup,
        attachments: &'a AttachmentMap,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            parser,
            aliases,
            attachments,
        })
    }

    /// Processes a fixed set of fragments in one batch pass.
    ///
    /// Discovery order (and therefore every tie-break) is derived from the
    /// sorted path list, not from the order the caller supplies or the
    /// order workers happen to finish in.
    pub fn run(&self, mut fragment_paths: Vec<PathBuf>) -> RunOutput {
        fragment_paths.sort();
        let ordered: Vec<(u64, &PathBuf)> = fragment_paths
            .iter()
            .enumerate()
            .map(|(seq, path)| (seq as u64, path))
            .collect();

        let map = ConversationMap::new();
        let diagnostics = Diagnostics::new();

        self.dispatch(&ordered, &map, &diagnostics);

        let conversations = finalize_all(map.into_conversations());
        let mut totals = Counters::default();
        for conversation in &conversations {
            totals.add(&conversation.counters);
        }

        let warnings = diagnostics.into_warnings();
        let summary = DiagnosticsSummary::from_warnings(&warnings);

        RunOutput {
            conversations,
            totals,
            warnings,
            summary,
        }
    }

    /// Runs the worker pool over the ordered fragment list.
    fn dispatch(&self, ordered: &[(u64, &PathBuf)], map: &ConversationMap, diagnostics: &Diagnostics) {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("fragment-{i}"))
            .build();

        match pool {
            Ok(pool) => pool.install(|| {
                ordered.par_iter().for_each(|(seq, path)| {
                    self.process_fragment(*seq, path, map, diagnostics);
                });
            }),
            // Pool creation failing is not a reason to lose the run.
            Err(_) => {
                for (seq, path) in ordered {
                    self.process_fragment(*seq, path, map, diagnostics);
                }
            }
        }
    }

    /// One worker's whole job: parse, resolve, group, filter, append.
    ///
    /// Any parse failure is recorded and the fragment skipped; other
    /// workers are unaffected.
    fn process_fragment(
        &self,
        seq: u64,
        path: &Path,
        map: &ConversationMap,
        diagnostics: &Diagnostics,
    ) {
        let fragment = match self.parser.parse(path) {
            Ok(fragment) => fragment,
            Err(err) => {
                diagnostics.record(Warning::SkippedFragment {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
                return;
            }
        };

        let own = &self.config.own_number;
        let page_set = page_participant_set(&fragment.page_participants, own);

        // Group detection happens once per fragment, before any message is
        // processed, so every record lands in the same conversation even
        // when individual sender tokens are ambiguous.
        if page_set.len() > 1 {
            self.process_group_fragment(seq, &fragment, page_set, map, diagnostics);
        } else {
            self.process_individual_fragment(seq, &fragment, map, diagnostics);
        }
    }

    fn process_group_fragment(
        &self,
        seq: u64,
        fragment: &RawFragment,
        participants: ParticipantSet,
        map: &ConversationMap,
        diagnostics: &Diagnostics,
    ) {
        let own = &self.config.own_number;
        let filter = MessageFilter::new(self.config, self.aliases);
        let handle = map.resolve(participants.clone(), true);

        for (index, raw) in fragment.records.iter().enumerate() {
            let sender = attribute_group_sender(&raw.sender_token, &participants, own);
            if sender.is_unknown_member() {
                diagnostics.record(Warning::UnknownGroupSender {
                    fragment: fragment.filename.clone(),
                });
            }

            let direction = raw.direction_hint.unwrap_or(if sender == *own {
                Direction::Sent
            } else {
                Direction::Received
            });

            let message = self
                .build_record(raw, direction, sender.clone(), sender, fragment, diagnostics)
                .with_provenance(seq, index as u32);

            if filter.accept(&message, &participants, true) {
                handle.lock().expect("conversation lock").append(message);
            }
        }
    }

    fn process_individual_fragment(
        &self,
        seq: u64,
        fragment: &RawFragment,
        map: &ConversationMap,
        diagnostics: &Diagnostics,
    ) {
        let own = &self.config.own_number;
        let filter = MessageFilter::new(self.config, self.aliases);
        let page_numbers: Vec<PhoneNumber> = fragment
            .page_participants
            .iter()
            .filter_map(|t| PhoneNumber::extract(t))
            .collect();
        let mut low_confidence_reported = false;

        for (index, raw) in fragment.records.iter().enumerate() {
            let resolved = resolve_counterpart(
                &raw.sender_token,
                &page_numbers,
                &fragment.filename,
                seq,
                own,
                self.aliases,
            );
            if resolved.is_low_confidence() && !low_confidence_reported {
                diagnostics.record(Warning::LowConfidenceResolution {
                    fragment: fragment.filename.clone(),
                    placeholder: resolved.number.clone(),
                });
                low_confidence_reported = true;
            }

            let counterpart = resolved.number;
            let direction = raw.direction_hint.unwrap_or_else(|| {
                if sender_is_own(&raw.sender_token, own) {
                    Direction::Sent
                } else {
                    Direction::Received
                }
            });
            let sender = match direction {
                Direction::Sent => own.clone(),
                Direction::Received => counterpart.clone(),
            };

            let participants: ParticipantSet = [counterpart.clone()].into_iter().collect();
            let message = self
                .build_record(raw, direction, sender, counterpart, fragment, diagnostics)
                .with_provenance(seq, index as u32);

            if filter.accept(&message, &participants, false) {
                let handle = map.resolve(participants, false);
                handle.lock().expect("conversation lock").append(message);
            }
        }
    }

    /// Builds the immutable record, resolving attachment tokens against
    /// the pre-built map.
    fn build_record(
        &self,
        raw: &RawRecord,
        direction: Direction,
        sender: PhoneNumber,
        counterpart: PhoneNumber,
        fragment: &RawFragment,
        diagnostics: &Diagnostics,
    ) -> MessageRecord {
        let mut attachments: Vec<AttachmentRef> = Vec::with_capacity(raw.attachment_tokens.len());
        for token in &raw.attachment_tokens {
            // Decoy tokens fail the acceptance condition and are dropped
            // silently; genuine-but-missing ones become orphan warnings.
            if let Some(reference) = self.attachments.resolve(token) {
                if !reference.is_resolved() {
                    diagnostics.record(Warning::OrphanAttachment {
                        token: token.clone(),
                        fragment: fragment.filename.clone(),
                    });
                }
                attachments.push(reference);
            }
        }

        MessageRecord::new(
            raw.kind,
            raw.timestamp,
            direction,
            sender,
            counterpart,
            raw.body.clone(),
        )
        .with_attachments(attachments)
    }
}

/// Returns `true` when the sender token refers to the account holder.
fn sender_is_own(sender_token: &str, own: &PhoneNumber) -> bool {
    is_self_marker(sender_token)
        || PhoneNumber::extract(sender_token).is_some_and(|n| n == *own)
}
