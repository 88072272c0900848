//! Conversation finalization: the aggregator/writer boundary.
//!
//! After all workers drain, each conversation is finalized exactly once:
//! its buffer is sorted by timestamp (ties broken by fragment discovery
//! order, then intra-fragment order), de-duplicated by dedup key, orphan
//! attachment entries are stripped, and counters are tallied over what
//! remains. Conversations left empty by filtering are discarded here and
//! contribute nothing to any aggregate.

use std::collections::HashSet;

use serde::Serialize;

use crate::engine::grouper::{Conversation, Counters};
use crate::phone::{ConversationId, ParticipantSet};
use crate::record::MessageRecord;

/// A finalized conversation ready for the output writer.
///
/// Counters are exact: the sum of the media counters equals the number of
/// attachment entries present in `messages`, and each kind counter equals
/// the number of messages of that kind.
#[derive(Debug, Serialize)]
pub struct FinalizedConversation {
    pub id: ConversationId,
    pub participants: ParticipantSet,
    pub is_group: bool,
    pub messages: Vec<MessageRecord>,
    pub counters: Counters,
}

/// Finalizes all conversations, dropping those with no surviving messages.
///
/// Input order is irrelevant; output is ordered by conversation id.
pub fn finalize_all(conversations: Vec<Conversation>) -> Vec<FinalizedConversation> {
    let mut finalized: Vec<FinalizedConversation> =
        conversations.into_iter().filter_map(finalize_one).collect();
    finalized.sort_by(|a, b| a.id.cmp(&b.id));
    finalized
}

/// Finalizes one conversation. Returns `None` when nothing survived.
fn finalize_one(conversation: Conversation) -> Option<FinalizedConversation> {
    let Conversation {
        id,
        participants,
        is_group,
        mut messages,
        mut counters,
    } = conversation;

    messages.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.fragment_seq.cmp(&b.fragment_seq))
            .then(a.intra_index.cmp(&b.intra_index))
    });

    // Dedup keeps the first occurrence in sorted order; the tie-break above
    // makes "first" deterministic even for overlapping fragments.
    let mut seen: HashSet<u64> = HashSet::with_capacity(messages.len());
    messages.retain(|m| seen.insert(m.dedup_key));

    if messages.is_empty() {
        return None;
    }

    // Orphan references were already reported as warnings; the written
    // output carries only attachments that exist on disk, and the counters
    // count exactly those.
    for message in &mut messages {
        message.attachments.retain(|a| a.is_resolved());
    }

    counters = Counters::default();
    for message in &messages {
        counters.record(message);
    }

    Some(FinalizedConversation {
        id,
        participants,
        is_group,
        messages,
        counters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::phone::{ConversationId, PhoneNumber};
    use crate::record::{AttachmentRef, Direction, MediaType, RecordKind};

    fn num(s: &str) -> PhoneNumber {
        PhoneNumber::normalize(s).unwrap()
    }

    fn conversation(messages: Vec<MessageRecord>) -> Conversation {
        let participants: ParticipantSet = [num("+15550100200")].into_iter().collect();
        Conversation {
            id: ConversationId::new(false, &participants),
            participants,
            is_group: false,
            messages,
            counters: Counters::default(),
        }
    }

    fn msg(secs: u32, body: &str) -> MessageRecord {
        MessageRecord::new(
            RecordKind::Sms,
            Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, secs).unwrap(),
            Direction::Received,
            num("+15550100200"),
            num("+15550100200"),
            body,
        )
    }

    #[test]
    fn test_sorted_by_timestamp() {
        let out = finalize_all(vec![conversation(vec![
            msg(5, "third"),
            msg(0, "first"),
            msg(2, "second"),
        ])]);

        let bodies: Vec<&str> = out[0].messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_timestamp_ties_broken_by_provenance() {
        let a = msg(0, "same instant a").with_provenance(2, 0);
        let b = msg(0, "same instant b").with_provenance(1, 3);
        let c = msg(0, "same instant c").with_provenance(1, 1);

        let out = finalize_all(vec![conversation(vec![a, b, c])]);
        let bodies: Vec<&str> = out[0].messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(
            bodies,
            vec!["same instant c", "same instant b", "same instant a"]
        );
    }

    #[test]
    fn test_dedup_across_fragments() {
        // Same message parsed out of two overlapping fragments.
        let original = msg(0, "hello").with_provenance(1, 0);
        let duplicate = msg(0, "hello").with_provenance(4, 2);

        let out = finalize_all(vec![conversation(vec![original, duplicate, msg(1, "next")])]);
        assert_eq!(out[0].messages.len(), 2);
        assert_eq!(out[0].counters.sms, 2);
    }

    #[test]
    fn test_empty_conversation_dropped() {
        let out = finalize_all(vec![conversation(vec![]), conversation(vec![msg(0, "hi")])]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_media_counters_match_written_attachments() {
        let with_media = msg(0, "").with_attachments(vec![
            AttachmentRef {
                token: "a-1-1".into(),
                resolved_path: Some("a-1-1.jpg".into()),
                media_type: Some(MediaType::Image),
            },
            AttachmentRef {
                token: "b-1-1".into(),
                resolved_path: Some("b-1-1.vcf".into()),
                media_type: Some(MediaType::Vcard),
            },
            AttachmentRef {
                token: "orphan-2-1".into(),
                resolved_path: None,
                media_type: Some(MediaType::Image),
            },
        ]);

        let out = finalize_all(vec![conversation(vec![with_media])]);
        let conv = &out[0];

        let written: usize = conv.messages.iter().map(|m| m.attachments.len()).sum();
        assert_eq!(conv.counters.media_total() as usize, written);
        assert_eq!(conv.counters.img, 1);
        assert_eq!(conv.counters.vcf, 1);
        // The orphan was stripped, not written, not counted.
        assert_eq!(written, 2);
    }

    #[test]
    fn test_output_ordered_by_id() {
        let p1: ParticipantSet = [num("+15550100300")].into_iter().collect();
        let c1 = Conversation {
            id: ConversationId::new(false, &p1),
            participants: p1,
            is_group: false,
            messages: vec![msg(0, "x")],
            counters: Counters::default(),
        };
        let out = finalize_all(vec![c1, conversation(vec![msg(0, "y")])]);
        assert_eq!(out[0].id.as_str(), "I_+15550100200");
        assert_eq!(out[1].id.as_str(), "I_+15550100300");
    }
}
