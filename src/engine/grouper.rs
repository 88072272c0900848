//! Conversation grouping.
//!
//! The grouper owns the shared id→conversation map. Creation is a
//! compare-and-insert guarded by the map lock; after that, every append
//! goes through the single conversation's own lock, so workers touching
//! different conversations never contend.
//!
//! Group detection happens once per fragment, before any message in it is
//! processed: a page-level participant list with more than one non-own
//! member classifies the whole fragment as one group conversation. Without
//! this up-front classification, per-message sender ambiguity would split
//! one physical conversation across inconsistent ids.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use crate::phone::{ConversationId, ParticipantSet, PhoneNumber};
use crate::record::{MediaType, MessageRecord, RecordKind};

/// Per-conversation counters.
///
/// Record-kind counters are incremented exactly once per surviving,
/// de-duplicated message during finalization; media counters count the
/// attachment entries literally present in the finalized output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub sms: u64,
    pub mms: u64,
    pub call: u64,
    pub voicemail: u64,
    pub img: u64,
    pub vcf: u64,
    pub audio: u64,
    pub video: u64,
}

impl Counters {
    /// Tallies one finalized message.
    pub fn record(&mut self, message: &MessageRecord) {
        match message.kind {
            RecordKind::Sms => self.sms += 1,
            RecordKind::Mms => self.mms += 1,
            RecordKind::Call => self.call += 1,
            RecordKind::Voicemail => self.voicemail += 1,
        }
        for attachment in &message.attachments {
            if !attachment.is_resolved() {
                continue;
            }
            match attachment.media_type {
                Some(MediaType::Image) => self.img += 1,
                Some(MediaType::Video) => self.video += 1,
                Some(MediaType::Audio) => self.audio += 1,
                Some(MediaType::Vcard) => self.vcf += 1,
                None => {}
            }
        }
    }

    /// Sum of the media counters.
    pub fn media_total(&self) -> u64 {
        self.img + self.vcf + self.audio + self.video
    }

    /// Total message count across kinds.
    pub fn message_total(&self) -> u64 {
        self.sms + self.mms + self.call + self.voicemail
    }

    /// Adds another counter set into this one.
    pub fn add(&mut self, other: &Counters) {
        self.sms += other.sms;
        self.mms += other.mms;
        self.call += other.call;
        self.voicemail += other.voicemail;
        self.img += other.img;
        self.vcf += other.vcf;
        self.audio += other.audio;
        self.video += other.video;
    }
}

/// One conversation under construction.
///
/// Owned by the [`ConversationMap`]; workers mutate it only through the
/// per-conversation lock handed out by [`ConversationMap::resolve`].
#[derive(Debug)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: ParticipantSet,
    pub is_group: bool,
    /// Unordered append buffer; finalization sorts and dedups it.
    pub messages: Vec<MessageRecord>,
    pub counters: Counters,
}

impl Conversation {
    fn new(id: ConversationId, participants: ParticipantSet, is_group: bool) -> Self {
        Self {
            id,
            participants,
            is_group,
            messages: Vec::new(),
            counters: Counters::default(),
        }
    }

    /// Appends a surviving message. Counters are deferred to finalization,
    /// where duplicates have been removed.
    pub fn append(&mut self, message: MessageRecord) {
        self.messages.push(message);
    }
}

/// Shared handle to one conversation's buffer.
pub type ConversationHandle = Arc<Mutex<Conversation>>;

/// The shared id→conversation map.
#[derive(Debug, Default)]
pub struct ConversationMap {
    inner: RwLock<HashMap<ConversationId, ConversationHandle>>,
}

impl ConversationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets or creates the conversation for a participant set.
    ///
    /// Lazily creates on first resolution; concurrent workers racing on
    /// the same new id converge on one instance. The returned handle's
    /// lock covers only this conversation, so unrelated conversations
    /// process fully in parallel.
    pub fn resolve(&self, participants: ParticipantSet, is_group: bool) -> ConversationHandle {
        let id = ConversationId::new(is_group, &participants);

        if let Some(handle) = self.inner.read().expect("conversation map lock").get(&id) {
            return Arc::clone(handle);
        }

        let mut map = self.inner.write().expect("conversation map lock");
        Arc::clone(map.entry(id.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(Conversation::new(id, participants, is_group)))
        }))
    }

    /// Number of conversations created so far.
    pub fn len(&self) -> usize {
        self.inner.read().expect("conversation map lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the map after all workers have finished.
    ///
    /// Panics if any handle is still shared, which would mean a worker
    /// outlived the dispatch phase.
    pub fn into_conversations(self) -> Vec<Conversation> {
        let map = self.inner.into_inner().expect("conversation map lock");
        let mut conversations: Vec<Conversation> = map
            .into_values()
            .map(|handle| {
                Arc::try_unwrap(handle)
                    .expect("conversation handle still shared after dispatch")
                    .into_inner()
                    .expect("conversation lock")
            })
            .collect();
        conversations.sort_by(|a, b| a.id.cmp(&b.id));
        conversations
    }
}

/// Normalizes raw page-participant tokens into the non-own participant set.
///
/// Unparseable tokens are dropped; the resolver chain covers fragments
/// whose page list is useless.
pub fn page_participant_set(raw_tokens: &[String], own: &PhoneNumber) -> ParticipantSet {
    ParticipantSet::from_numbers(
        raw_tokens.iter().filter_map(|t| PhoneNumber::extract(t)),
        own,
    )
}
