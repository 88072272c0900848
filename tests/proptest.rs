//! Property-based tests.
//!
//! These focus on the determinism guarantees: any dispatch order, worker
//! count or duplicated input must reconstruct exactly the same
//! conversations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use voicepack::Result;
use voicepack::alias::NoAliases;
use voicepack::config::EngineConfig;
use voicepack::engine::{AttachmentMap, Engine, RunOutput};
use voicepack::fragment::{FragmentParser, RawFragment, RawRecord};
use voicepack::phone::PhoneNumber;
use voicepack::record::RecordKind;

/// In-memory fragment source keyed by path.
struct StaticParser {
    fragments: HashMap<PathBuf, RawFragment>,
}

impl FragmentParser for StaticParser {
    fn parse(&self, path: &Path) -> Result<RawFragment> {
        self.fragments
            .get(path)
            .cloned()
            .ok_or_else(|| voicepack::VoicepackError::invalid_format("unknown fragment"))
    }
}

fn raw(kind: RecordKind, secs: u32, sender_token: &str, body: &str) -> RawRecord {
    RawRecord {
        kind,
        timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, secs).unwrap(),
        direction_hint: None,
        sender_token: sender_token.to_string(),
        body: body.to_string(),
        attachment_tokens: Vec::new(),
    }
}

fn fragment(name: &str, participants: &[&str], records: Vec<RawRecord>) -> (PathBuf, RawFragment) {
    (
        PathBuf::from(name),
        RawFragment {
            filename: name.to_string(),
            page_participants: participants.iter().map(|p| format!("tel:{p}")).collect(),
            records,
        },
    )
}

/// A fixed corpus: two individual threads (one with an overlapping
/// duplicate), one group thread.
fn corpus() -> StaticParser {
    let shared = raw(RecordKind::Sms, 5, "tel:+15550100200", "seen in both slices");
    StaticParser {
        fragments: HashMap::from([
            fragment(
                "+15550100200 - Text - 2024-01-15T10_30_00Z.html",
                &["+15550100200"],
                vec![
                    raw(RecordKind::Sms, 0, "tel:+15550100200", "alpha"),
                    shared.clone(),
                ],
            ),
            fragment(
                "+15550100200 - Text - 2024-02-01T10_30_00Z.html",
                &["+15550100200"],
                vec![shared, raw(RecordKind::Sms, 9, "tel:+15550100100", "beta")],
            ),
            fragment(
                "+15550100300 - Text - 2024-01-16T08_00_00Z.html",
                &["+15550100300"],
                vec![raw(RecordKind::Sms, 3, "tel:+15550100300", "gamma")],
            ),
            fragment(
                "Group Conversation - 2024-01-15T09_00_00Z.html",
                &["+15550100201", "+15550100202"],
                vec![
                    raw(RecordKind::Sms, 1, "tel:+15550100201", "delta"),
                    raw(RecordKind::Sms, 2, "tel:+15550100100", "epsilon"),
                ],
            ),
        ]),
    }
}

fn corpus_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = corpus().fragments.into_keys().collect();
    paths.sort();
    paths
}

fn run_with(parser: &StaticParser, workers: usize, paths: Vec<PathBuf>) -> RunOutput {
    let config = EngineConfig::new("+15550100100")
        .unwrap()
        .with_workers(workers);
    let attachments = AttachmentMap::default();
    Engine::new(&config, parser, &NoAliases, &attachments)
        .unwrap()
        .run(paths)
}

/// Observable shape of a run, for equality across dispatch orders.
fn shape(output: &RunOutput) -> Vec<(String, Vec<String>)> {
    output
        .conversations
        .iter()
        .map(|c| {
            (
                c.id.as_str().to_string(),
                c.messages
                    .iter()
                    .map(|m| format!("{}|{}|{}", m.timestamp.timestamp(), m.sender, m.body))
                    .collect(),
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Reconstruction is invariant under input order and worker count.
    #[test]
    fn reconstruction_invariant_under_dispatch_order(
        shuffled in Just(corpus_paths()).prop_shuffle(),
        workers in 1usize..=4,
    ) {
        let parser = corpus();
        let baseline = run_with(&parser, 1, corpus_paths());
        let shuffled_run = run_with(&parser, workers, shuffled);

        prop_assert_eq!(shape(&baseline), shape(&shuffled_run));
        prop_assert_eq!(baseline.totals, shuffled_run.totals);
    }

    /// Processing the same fragment twice changes nothing: the dedup key
    /// collapses repeated content.
    #[test]
    fn duplicated_fragment_paths_are_idempotent(
        dup_index in 0usize..4,
        workers in 1usize..=4,
    ) {
        let parser = corpus();
        let baseline = run_with(&parser, 1, corpus_paths());

        let mut paths = corpus_paths();
        let extra = paths[dup_index].clone();
        paths.push(extra);
        let doubled = run_with(&parser, workers, paths);

        prop_assert_eq!(shape(&baseline), shape(&doubled));
        prop_assert_eq!(baseline.totals, doubled.totals);
    }

    /// Normalization is idempotent on its own output.
    #[test]
    fn normalize_idempotent(
        raw in prop::sample::select(vec![
            "+15550100200",
            "5550100200",
            "(555) 010-0200",
            "1-555-010-0200",
            "555.010.0200",
            "22395",
            "+447911123456",
        ])
    ) {
        let once = PhoneNumber::normalize(raw).unwrap();
        let twice = PhoneNumber::normalize(once.as_str()).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Ten bare US digits always normalize to a +1 number.
    #[test]
    fn ten_digits_get_country_code(digits in proptest::collection::vec(0u8..10, 10)) {
        // Avoid the 11-digit leading-1 ambiguity by pinning the area code.
        let raw: String = std::iter::once('5')
            .chain(digits.iter().skip(1).map(|d| char::from(b'0' + d)))
            .collect();
        let normalized = PhoneNumber::normalize(&raw).unwrap();
        prop_assert!(normalized.as_str().starts_with("+15"));
        prop_assert_eq!(normalized.as_str().len(), 12);
    }

    /// Synthetic placeholders are a pure function of their inputs and stay
    /// in the reserved namespace.
    #[test]
    fn synthetic_numbers_deterministic(name in "[A-Za-z ]{1,20}", seq in 0u64..1000) {
        let a = PhoneNumber::synthetic(&name, seq);
        let b = PhoneNumber::synthetic(&name, seq);
        prop_assert_eq!(&a, &b);
        prop_assert!(a.is_synthetic());
        prop_assert!(a.as_str().starts_with("+000"));
        prop_assert_eq!(a.as_str().len(), 13);
    }
}
