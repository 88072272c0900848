//! Output writers for finalized conversations.
//!
//! - [`write_conversation`] / [`to_json`] — one JSON artifact per
//!   conversation
//! - [`write_index`] — run-level index with aggregate statistics and
//!   diagnostics
//! - [`write_stats_csv`] — per-conversation counter table

mod csv_writer;
mod json_writer;

pub use csv_writer::write_stats_csv;
pub use json_writer::{to_json, write_conversation, write_index};

/// Maps a conversation id to a safe artifact file stem.
///
/// `+` and alphanumerics pass through; everything else (the `,` separator
/// in group ids, mostly) becomes `_`.
pub fn artifact_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '+' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_stem() {
        assert_eq!(artifact_stem("I_+15550100200"), "I_+15550100200");
        assert_eq!(
            artifact_stem("G_+15550100201,+15550100202"),
            "G_+15550100201_+15550100202"
        );
    }
}
