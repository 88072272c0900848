//! JSON output writer.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::diagnostics::DiagnosticsSummary;
use crate::engine::{Counters, FinalizedConversation, RunOutput};
use crate::error::Result;
use crate::output::artifact_stem;

/// Converts one finalized conversation to a pretty JSON string.
pub fn to_json(conversation: &FinalizedConversation) -> Result<String> {
    Ok(serde_json::to_string_pretty(conversation)?)
}

/// Writes one conversation artifact into `out_dir`.
///
/// The file is named after the conversation id
/// (`I_+15550100200.json`, `G_+15550100201_+15550100202.json`).
pub fn write_conversation(
    conversation: &FinalizedConversation,
    out_dir: &Path,
) -> Result<PathBuf> {
    let path = out_dir.join(format!("{}.json", artifact_stem(conversation.id.as_str())));
    let mut file = File::create(&path)?;
    file.write_all(to_json(conversation)?.as_bytes())?;
    Ok(path)
}

/// Run-level index entry for one conversation.
#[derive(Serialize)]
struct IndexEntry<'a> {
    id: &'a str,
    is_group: bool,
    participants: Vec<&'a str>,
    messages: usize,
    counters: &'a Counters,
}

/// The run index: every surviving conversation plus aggregate statistics.
#[derive(Serialize)]
struct Index<'a> {
    conversations: Vec<IndexEntry<'a>>,
    totals: &'a Counters,
    diagnostics: &'a DiagnosticsSummary,
}

/// Writes `index.json` into `out_dir`.
pub fn write_index(output: &RunOutput, out_dir: &Path) -> Result<PathBuf> {
    let index = Index {
        conversations: output
            .conversations
            .iter()
            .map(|c| IndexEntry {
                id: c.id.as_str(),
                is_group: c.is_group,
                participants: c.participants.iter().map(|p| p.as_str()).collect(),
                messages: c.messages.len(),
                counters: &c.counters,
            })
            .collect(),
        totals: &output.totals,
        diagnostics: &output.summary,
    };

    let path = out_dir.join("index.json");
    let mut file = File::create(&path)?;
    file.write_all(serde_json::to_string_pretty(&index)?.as_bytes())?;
    Ok(path)
}
