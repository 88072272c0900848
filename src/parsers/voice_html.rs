//! Google Voice Takeout HTML fragment parser.
//!
//! Takeout writes one HTML file per conversation slice. The filename
//! carries the contact and record kind:
//!
//! - `+15550100200 - Text - 2024-01-15T10_30_00Z.html`
//! - `Alice Smith - Voicemail - 2024-02-01T08_00_00Z.html`
//! - `Bob - Placed - 2024-03-10T19_45_00Z.html` (also `Received`, `Missed`)
//! - `Group Conversation - 2024-04-02T12_00_00Z.html`
//!
//! Message blocks are `div.message` elements with an `abbr.dt` timestamp,
//! a `cite`-wrapped sender carrying a `tel:` href, a `<q>` body and
//! optional `img`/`audio`/`a.vcard` attachment references. Calls and
//! voicemails are `div.haudio` blocks with `abbr.published` timestamps,
//! an optional `abbr.duration` and a voicemail transcript in
//! `span.full-text`. A `div.participants` block lists the page-level
//! participants for group conversations.
//!
//! This parser only extracts raw records; participant resolution and
//! grouping happen downstream, behind the markup boundary.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{ParseErrorKind, Result, VoicepackError};
use crate::fragment::{FragmentParser, RawFragment, RawRecord};
use crate::record::{Direction, RecordKind};

/// Compiled patterns for the Takeout markup. Built once, shared by all
/// workers.
struct Patterns {
    message_block: Regex,
    haudio_block: Regex,
    dt: Regex,
    published: Regex,
    cite: Regex,
    tel_href: Regex,
    body: Regex,
    img_src: Regex,
    audio_src: Regex,
    vcard_href: Regex,
    duration: Regex,
    full_text: Regex,
    participants_div: Regex,
    tag: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        message_block: Regex::new(r#"(?s)<div class="message">(.*?)</div>"#).unwrap(),
        haudio_block: Regex::new(r#"(?s)<div class="haudio">(.*?)</div>"#).unwrap(),
        dt: Regex::new(r#"<abbr class="dt" title="([^"]+)""#).unwrap(),
        published: Regex::new(r#"<abbr class="published" title="([^"]+)""#).unwrap(),
        cite: Regex::new(r#"(?s)<cite[^>]*>(.*?)</cite>"#).unwrap(),
        tel_href: Regex::new(r#"href="tel:([^"]+)""#).unwrap(),
        body: Regex::new(r"(?s)<q>(.*?)</q>").unwrap(),
        img_src: Regex::new(r#"<img[^>]*src="([^"]+)""#).unwrap(),
        audio_src: Regex::new(r#"<audio[^>]*src="([^"]+)""#).unwrap(),
        vcard_href: Regex::new(r#"<a class="vcard"[^>]*href="([^"]+)""#).unwrap(),
        duration: Regex::new(r#"<abbr class="duration" title="([^"]+)""#).unwrap(),
        full_text: Regex::new(r#"(?s)<span class="full-text">(.*?)</span>"#).unwrap(),
        participants_div: Regex::new(r#"(?s)<div class="participants">(.*?)</div>"#).unwrap(),
        tag: Regex::new(r"<[^>]+>").unwrap(),
    })
}

/// What the fragment filename says the file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Text,
    Voicemail,
    PlacedCall,
    ReceivedCall,
    MissedCall,
}

impl FragmentKind {
    fn from_filename(filename: &str) -> Self {
        if filename.contains(" - Voicemail - ") {
            FragmentKind::Voicemail
        } else if filename.contains(" - Placed - ") {
            FragmentKind::PlacedCall
        } else if filename.contains(" - Received - ") {
            FragmentKind::ReceivedCall
        } else if filename.contains(" - Missed - ") {
            FragmentKind::MissedCall
        } else {
            // `- Text -` and group-conversation fragments both carry
            // message blocks.
            FragmentKind::Text
        }
    }

    fn call_direction(self) -> Option<Direction> {
        match self {
            FragmentKind::PlacedCall => Some(Direction::Sent),
            FragmentKind::ReceivedCall | FragmentKind::MissedCall | FragmentKind::Voicemail => {
                Some(Direction::Received)
            }
            FragmentKind::Text => None,
        }
    }
}

/// Parser for Takeout HTML fragments.
///
/// # Example
///
/// ```rust,no_run
/// use voicepack::fragment::FragmentParser;
/// use voicepack::parsers::VoiceHtmlParser;
///
/// let parser = VoiceHtmlParser::new();
/// let fragment = parser.parse("+15550100200 - Text - 2024-01-15T10_30_00Z.html".as_ref())?;
/// # Ok::<(), voicepack::VoicepackError>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct VoiceHtmlParser;

impl VoiceHtmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses fragment content from a string.
    pub fn parse_content(&self, filename: &str, content: &str) -> Result<RawFragment> {
        let kind = FragmentKind::from_filename(filename);
        let page_participants = parse_participants(content);

        let records = match kind {
            FragmentKind::Text => parse_message_blocks(content, filename)?,
            _ => parse_haudio_blocks(content, filename, kind)?,
        };

        Ok(RawFragment {
            filename: filename.to_string(),
            page_participants,
            records,
        })
    }
}

impl FragmentParser for VoiceHtmlParser {
    fn parse(&self, path: &Path) -> Result<RawFragment> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = fs::read_to_string(path)?;
        self.parse_content(&filename, &content)
    }
}

/// Extracts page-level participant tokens (`tel:` references).
fn parse_participants(content: &str) -> Vec<String> {
    let p = patterns();
    let Some(caps) = p.participants_div.captures(content) else {
        return Vec::new();
    };
    let inner = caps.get(1).map_or("", |m| m.as_str());
    p.tel_href
        .captures_iter(inner)
        .map(|c| format!("tel:{}", &c[1]))
        .collect()
}

/// Parses SMS/MMS message blocks from a text fragment.
fn parse_message_blocks(content: &str, filename: &str) -> Result<Vec<RawRecord>> {
    let p = patterns();
    let mut records = Vec::new();

    for block_caps in p.message_block.captures_iter(content) {
        let block = block_caps.get(1).map_or("", |m| m.as_str());

        // A block without a timestamp is malformed; skip it rather than
        // losing the rest of the fragment.
        let Some(ts) = p.dt.captures(block).and_then(|c| parse_rfc3339(&c[1])) else {
            continue;
        };

        let sender_token = sender_token(block);
        let body = p
            .body
            .captures(block)
            .map(|c| unescape(&strip_tags(&c[1])))
            .unwrap_or_default();

        let mut attachment_tokens: Vec<String> = Vec::new();
        for caps in p.img_src.captures_iter(block) {
            attachment_tokens.push(unescape(&caps[1]));
        }
        for caps in p.audio_src.captures_iter(block) {
            attachment_tokens.push(unescape(&caps[1]));
        }
        for caps in p.vcard_href.captures_iter(block) {
            attachment_tokens.push(unescape(&caps[1]));
        }

        let kind = if attachment_tokens.is_empty() {
            RecordKind::Sms
        } else {
            RecordKind::Mms
        };

        records.push(RawRecord {
            kind,
            timestamp: ts,
            direction_hint: None,
            sender_token,
            body,
            attachment_tokens,
        });
    }

    if records.is_empty() && !p.message_block.is_match(content) {
        return Err(VoicepackError::parse(
            ParseErrorKind::MissingElement("message blocks"),
            filename,
        ));
    }

    Ok(records)
}

/// Parses call/voicemail blocks.
fn parse_haudio_blocks(content: &str, filename: &str, kind: FragmentKind) -> Result<Vec<RawRecord>> {
    let p = patterns();
    let mut records = Vec::new();

    // Call fragments without an inner haudio div still carry the published
    // timestamp at the top level; treat the whole document as one block.
    let blocks: Vec<&str> = if p.haudio_block.is_match(content) {
        p.haudio_block
            .captures_iter(content)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    } else {
        vec![content]
    };

    for block in blocks {
        let Some(ts) = p.published.captures(block).and_then(|c| parse_rfc3339(&c[1])) else {
            continue;
        };

        let record_kind = if kind == FragmentKind::Voicemail {
            RecordKind::Voicemail
        } else {
            RecordKind::Call
        };

        let body = match kind {
            FragmentKind::Voicemail => p
                .full_text
                .captures(block)
                .map(|c| unescape(&strip_tags(&c[1])))
                .unwrap_or_default(),
            FragmentKind::MissedCall => "Missed call".to_string(),
            _ => p
                .duration
                .captures(block)
                .map(|c| format!("Call, duration {}", &c[1]))
                .unwrap_or_else(|| "Call".to_string()),
        };

        let mut attachment_tokens = Vec::new();
        if kind == FragmentKind::Voicemail {
            for caps in p.audio_src.captures_iter(block) {
                attachment_tokens.push(unescape(&caps[1]));
            }
        }

        records.push(RawRecord {
            kind: record_kind,
            timestamp: ts,
            direction_hint: kind.call_direction(),
            sender_token: sender_token(block),
            body,
            attachment_tokens,
        });
    }

    if records.is_empty() {
        return Err(VoicepackError::parse(
            ParseErrorKind::MissingElement("published timestamp"),
            filename,
        ));
    }

    Ok(records)
}

/// Builds the raw sender token for a block: the `tel:` reference (when
/// present) followed by the stripped display text, e.g. `tel:+15550100200
/// Alice` or just `Me`.
fn sender_token(block: &str) -> String {
    let p = patterns();
    let Some(caps) = p.cite.captures(block) else {
        return String::new();
    };
    let inner = caps.get(1).map_or("", |m| m.as_str());

    let tel = p.tel_href.captures(inner).map(|c| c[1].to_string());
    let display = unescape(&strip_tags(inner));

    match tel {
        Some(tel) => format!("tel:{tel} {display}").trim_end().to_string(),
        None => display,
    }
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Removes markup tags, collapsing the remaining text.
fn strip_tags(html: &str) -> String {
    patterns().tag.replace_all(html, "").trim().to_string()
}

/// Decodes the HTML entities Takeout actually emits.
fn unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT_FRAGMENT: &str = r#"<html><head><title>Me</title></head><body>
<div class="hChatLog hfeed">
<div class="message">
<abbr class="dt" title="2024-01-15T10:30:00.000-05:00">Jan 15</abbr>:
<cite class="sender vcard"><a class="tel" href="tel:+15550100200"><span class="fn">Alice</span></a></cite>:
<q>Hey, are you coming?</q>
</div>
<div class="message">
<abbr class="dt" title="2024-01-15T10:31:00.000-05:00">Jan 15</abbr>:
<cite class="sender vcard"><a class="tel" href="tel:+15550100100"><abbr class="fn" title="">Me</abbr></a></cite>:
<q>On my way &amp; almost there</q>
</div>
</div>
</body></html>"#;

    const MMS_FRAGMENT: &str = r#"<html><body>
<div class="message">
<abbr class="dt" title="2024-01-15T10:32:00.000-05:00">Jan 15</abbr>:
<cite class="sender vcard"><a class="tel" href="tel:+15550100200"><span class="fn">Alice</span></a></cite>:
<q>Look at this</q>
<img src="Alice - Text - 2024-01-15T10_32_00Z-2-1" alt="Image MMS" />
</div>
</body></html>"#;

    const GROUP_FRAGMENT: &str = r#"<html><body>
<div class="hChatLog hfeed">
<div class="message">
<abbr class="dt" title="2024-01-15T09:00:00.000-05:00">Jan 15</abbr>:
<cite class="sender vcard"><a class="tel" href="tel:+15550100201"><span class="fn">Bea</span></a></cite>:
<q>Lunch?</q>
</div>
</div>
<div class="participants">Group conversation with:
<cite class="sender vcard"><a class="tel" href="tel:+15550100201"><span class="fn">Bea</span></a></cite>,
<cite class="sender vcard"><a class="tel" href="tel:+15550100202"><span class="fn">Cal</span></a></cite>
</div>
</body></html>"#;

    const VOICEMAIL_FRAGMENT: &str = r#"<html><body>
<div class="haudio">
<span class="fn">Voicemail from Alice</span>
<cite class="sender vcard"><a class="tel" href="tel:+15550100200"><span class="fn">Alice</span></a></cite>
<abbr class="published" title="2024-02-01T08:00:00.000-05:00">Feb 1</abbr>
<span class="full-text">Call me back when you can.</span>
<audio src="Alice - Voicemail - 2024-02-01T08_00_00Z.mp3"></audio>
</div>
</body></html>"#;

    const MISSED_CALL_FRAGMENT: &str = r#"<html><body>
<div class="haudio">
<cite class="sender vcard"><a class="tel" href="tel:+15550100200"><span class="fn">Alice</span></a></cite>
<abbr class="published" title="2024-03-10T19:45:00.000-05:00">Mar 10</abbr>
</div>
</body></html>"#;

    #[test]
    fn test_parse_text_fragment() {
        let parser = VoiceHtmlParser::new();
        let fragment = parser
            .parse_content("Alice - Text - 2024-01-15T10_30_00Z.html", TEXT_FRAGMENT)
            .unwrap();

        assert_eq!(fragment.records.len(), 2);

        let first = &fragment.records[0];
        assert_eq!(first.kind, RecordKind::Sms);
        assert_eq!(first.body, "Hey, are you coming?");
        assert!(first.sender_token.contains("tel:+15550100200"));
        // Offset -05:00 normalizes to UTC.
        assert_eq!(first.timestamp.to_rfc3339(), "2024-01-15T15:30:00+00:00");

        let second = &fragment.records[1];
        assert!(second.sender_token.contains("Me"));
        assert_eq!(second.body, "On my way & almost there");
    }

    #[test]
    fn test_parse_mms_attachment_tokens() {
        let parser = VoiceHtmlParser::new();
        let fragment = parser
            .parse_content("Alice - Text - 2024-01-15T10_32_00Z.html", MMS_FRAGMENT)
            .unwrap();

        let record = &fragment.records[0];
        assert_eq!(record.kind, RecordKind::Mms);
        assert_eq!(
            record.attachment_tokens,
            vec!["Alice - Text - 2024-01-15T10_32_00Z-2-1"]
        );
    }

    #[test]
    fn test_parse_group_participants() {
        let parser = VoiceHtmlParser::new();
        let fragment = parser
            .parse_content("Group Conversation - 2024-01-15T09_00_00Z.html", GROUP_FRAGMENT)
            .unwrap();

        assert_eq!(
            fragment.page_participants,
            vec!["tel:+15550100201", "tel:+15550100202"]
        );
        assert_eq!(fragment.records.len(), 1);
    }

    #[test]
    fn test_parse_voicemail() {
        let parser = VoiceHtmlParser::new();
        let fragment = parser
            .parse_content(
                "Alice - Voicemail - 2024-02-01T08_00_00Z.html",
                VOICEMAIL_FRAGMENT,
            )
            .unwrap();

        let record = &fragment.records[0];
        assert_eq!(record.kind, RecordKind::Voicemail);
        assert_eq!(record.direction_hint, Some(Direction::Received));
        assert_eq!(record.body, "Call me back when you can.");
        assert_eq!(record.attachment_tokens.len(), 1);
    }

    #[test]
    fn test_parse_missed_call() {
        let parser = VoiceHtmlParser::new();
        let fragment = parser
            .parse_content(
                "Alice - Missed - 2024-03-10T19_45_00Z.html",
                MISSED_CALL_FRAGMENT,
            )
            .unwrap();

        let record = &fragment.records[0];
        assert_eq!(record.kind, RecordKind::Call);
        assert_eq!(record.direction_hint, Some(Direction::Received));
        assert_eq!(record.body, "Missed call");
    }

    #[test]
    fn test_placed_call_direction() {
        let html = MISSED_CALL_FRAGMENT;
        let parser = VoiceHtmlParser::new();
        let fragment = parser
            .parse_content("Alice - Placed - 2024-03-10T19_45_00Z.html", html)
            .unwrap();

        assert_eq!(fragment.records[0].direction_hint, Some(Direction::Sent));
    }

    #[test]
    fn test_malformed_fragment_errors() {
        let parser = VoiceHtmlParser::new();
        let result = parser.parse_content("Alice - Text - x.html", "<html><body>nothing</body></html>");
        assert!(result.is_err());
    }

    #[test]
    fn test_block_without_timestamp_skipped() {
        let html = r#"<div class="message"><q>no timestamp</q></div>
<div class="message"><abbr class="dt" title="2024-01-15T10:30:00.000Z">x</abbr><q>ok</q></div>"#;
        let parser = VoiceHtmlParser::new();
        let fragment = parser.parse_content("A - Text - x.html", html).unwrap();
        assert_eq!(fragment.records.len(), 1);
        assert_eq!(fragment.records[0].body, "ok");
    }

    #[test]
    fn test_fragment_kind_from_filename() {
        assert_eq!(
            FragmentKind::from_filename("A - Text - 2024.html"),
            FragmentKind::Text
        );
        assert_eq!(
            FragmentKind::from_filename("A - Voicemail - 2024.html"),
            FragmentKind::Voicemail
        );
        assert_eq!(
            FragmentKind::from_filename("Group Conversation - 2024.html"),
            FragmentKind::Text
        );
    }
}
