//! CSV statistics writer.

use std::fs::File;
use std::path::Path;

use crate::engine::FinalizedConversation;
use crate::error::Result;

/// Writes the per-conversation counter table.
///
/// # Format
/// - Delimiter: `;`
/// - One row per surviving conversation, ordered by id
/// - Encoding: UTF-8
pub fn write_stats_csv(conversations: &[FinalizedConversation], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(file);

    writer.write_record([
        "conversation_id",
        "participants",
        "is_group",
        "sms",
        "mms",
        "call",
        "voicemail",
        "img",
        "vcf",
        "audio",
        "video",
        "total_messages",
    ])?;

    for conv in conversations {
        let c = &conv.counters;
        writer.write_record([
            conv.id.as_str().to_string(),
            conv.participants.canonical_join(),
            conv.is_group.to_string(),
            c.sms.to_string(),
            c.mms.to_string(),
            c.call.to_string(),
            c.voicemail.to_string(),
            c.img.to_string(),
            c.vcf.to_string(),
            c.audio.to_string(),
            c.video.to_string(),
            c.message_total().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
