//! # Voicepack
//!
//! A Rust library for reconstructing conversations from Google Voice
//! Takeout exports.
//!
//! ## Overview
//!
//! A Takeout export scatters each conversation across many per-thread HTML
//! pages: text threads, MMS pages with attachments, call records and
//! voicemails, all named after whichever contact detail the exporter had at
//! the time. Voicepack reads the whole directory in one batch pass and
//! rebuilds it into one artifact per conversation:
//!
//! - **Identity** — counterpart numbers are normalized to E.164, contact
//!   names are resolved back to numbers through an alias store, and the
//!   rare fragment with no usable identity gets a deterministic placeholder
//! - **Grouping** — records from every fragment of the same counterpart
//!   (or group member set) land in a single conversation, regardless of
//!   processing order
//! - **Attachments** — image, vCard, audio and video references are
//!   matched against the export's media files, including the exporter's
//!   filename-truncation quirks
//! - **Statistics** — exact per-conversation and aggregate counters for
//!   every record and media type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use voicepack::alias::NoAliases;
//! use voicepack::config::EngineConfig;
//! use voicepack::engine::{AttachmentMap, Engine};
//! use voicepack::output::write_conversation;
//! use voicepack::parsers::VoiceHtmlParser;
//!
//! fn main() -> voicepack::Result<()> {
//!     let config = EngineConfig::new("+15550100100")?;
//!     let parser = VoiceHtmlParser::new();
//!     let attachments = AttachmentMap::from_dir("Takeout/Voice/Calls".as_ref())?;
//!
//!     let engine = Engine::new(&config, &parser, &NoAliases, &attachments)?;
//!     let output = engine.run(vec![PathBuf::from(
//!         "Takeout/Voice/Calls/+15550100200 - Text - 2024-01-15T10_30_00Z.html",
//!     )]);
//!
//!     for conversation in &output.conversations {
//!         write_conversation(conversation, "voicepack_out".as_ref())?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`engine`] — the batch reconstruction engine
//!   - [`Engine`](engine::Engine) — worker-pool dispatch over fragments
//!   - [`AttachmentMap`](engine::AttachmentMap) — token-to-file resolution
//!   - [`FinalizedConversation`](engine::FinalizedConversation), [`Counters`](engine::Counters)
//! - [`parsers`] — fragment parsers
//!   - [`VoiceHtmlParser`](parsers::VoiceHtmlParser) — Takeout HTML pages
//! - [`phone`] — [`PhoneNumber`](phone::PhoneNumber) normalization,
//!   [`ParticipantSet`](phone::ParticipantSet), [`ConversationId`](phone::ConversationId)
//! - [`resolve`] — counterpart resolution and group sender attribution
//! - [`alias`] — the [`AliasLookup`](alias::AliasLookup) boundary
//! - [`fragment`] — the [`FragmentParser`](fragment::FragmentParser) trait
//!   and raw fragment types
//! - [`config`] — [`EngineConfig`](config::EngineConfig)
//! - [`diagnostics`] — structured warnings and their run summary
//! - [`output`] — JSON artifact, index and CSV statistics writers
//! - [`error`] — unified error types ([`VoicepackError`], [`Result`])
//! - [`prelude`] — convenient re-exports

pub mod alias;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod output;
pub mod parsers;
pub mod phone;
pub mod record;
pub mod resolve;

// Re-export the main types at the crate root for convenience
pub use error::{Result, VoicepackError};

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use voicepack::prelude::*;
/// ```
pub mod prelude {
    // Error types
    pub use crate::error::{Result, VoicepackError};

    // Engine and its run output
    pub use crate::engine::{AttachmentMap, Engine, FinalizedConversation, RunOutput};

    // Configuration
    pub use crate::config::EngineConfig;

    // Identity types
    pub use crate::phone::{ConversationId, ParticipantSet, PhoneNumber};

    // Records
    pub use crate::record::{AttachmentRef, Direction, MediaType, MessageRecord, RecordKind};

    // Parsing boundary and the bundled parser
    pub use crate::fragment::{FragmentParser, RawFragment, RawRecord};
    pub use crate::parsers::VoiceHtmlParser;

    // Aliases
    pub use crate::alias::{AliasLookup, MemoryAliasStore, NoAliases};

    // Diagnostics
    pub use crate::diagnostics::{DiagnosticsSummary, Warning};

    // Writers
    pub use crate::output::{to_json, write_conversation, write_index, write_stats_csv};
}
