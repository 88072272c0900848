//! Attachment mapping.
//!
//! Built once, single-threaded, before any worker starts; read-only and
//! shareable without synchronization afterward.
//!
//! Takeout drops attachments next to the fragments with names derived from
//! the fragment filename plus a numeric suffix, truncating long names.
//! Fragment markup references them by token, usually without an extension.
//! Decoy strings embedding timestamps or phone numbers are common, so a
//! candidate is accepted only when it both looks like an attachment (media
//! extension, or the trailing numeric export suffix) and is not itself a
//! structurally valid fragment-page filename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::record::{AttachmentRef, MediaType};

/// Extensions recognized as media attachments.
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "heic"];
const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "3gp", "mov", "avi", "webm"];
const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "amr", "m4a", "wav", "ogg", "opus", "aac"];

/// Takeout truncates attachment filenames derived from long contact names.
const TRUNCATION_LIMIT: usize = 50;

fn export_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\d+(-\d+)?$").unwrap())
}

fn fragment_page_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^.+ - (Text|Voicemail|Placed|Received|Missed) - \d{4}-\d{2}-\d{2}T\d{2}_\d{2}_\d{2}Z?(\.html)?$",
        )
        .unwrap()
    })
}

/// Returns the media type for a file extension, if recognized.
fn media_type_for_extension(ext: &str) -> Option<MediaType> {
    let ext = ext.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaType::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaType::Video)
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaType::Audio)
    } else if ext == "vcf" {
        Some(MediaType::Vcard)
    } else {
        None
    }
}

/// Returns `true` when `name` is structurally a fragment-page filename.
///
/// Page names embed timestamps and often phone numbers, which is exactly
/// why they make good decoys.
fn is_fragment_page_name(name: &str) -> bool {
    fragment_page_re().is_match(name)
}

/// Returns `true` when `candidate` passes the dual acceptance condition
/// for attachment references.
fn is_attachment_candidate(candidate: &str) -> bool {
    if is_fragment_page_name(candidate) {
        return false;
    }
    let (stem, ext) = split_extension(candidate);
    ext.and_then(media_type_for_extension).is_some() || export_suffix_re().is_match(stem)
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        // A dot-run inside a token isn't an extension unless it's short and
        // alphanumeric.
        Some((stem, ext)) if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(char::is_alphanumeric) => {
            (stem, Some(ext))
        }
        _ => (name, None),
    }
}

/// Read-only token→file mapping.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use voicepack::engine::AttachmentMap;
///
/// let listing = vec![PathBuf::from("Alice - Text - 2024-01-15T10_32_00Z-2-1.jpg")];
/// let map = AttachmentMap::build(&listing);
/// assert_eq!(map.len(), 1);
///
/// let resolved = map.resolve("Alice - Text - 2024-01-15T10_32_00Z-2-1").unwrap();
/// assert!(resolved.is_resolved());
/// ```
#[derive(Debug, Default)]
pub struct AttachmentMap {
    /// File stem → (path, media type), sorted for deterministic prefix
    /// matching.
    by_stem: BTreeMap<String, (PathBuf, MediaType)>,
}

impl AttachmentMap {
    /// Builds the mapping from a directory listing.
    ///
    /// Files failing the dual acceptance condition are ignored; they are
    /// page fragments or unrelated files, not attachments.
    pub fn build(listing: &[PathBuf]) -> Self {
        let mut by_stem = BTreeMap::new();

        for path in listing {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if !is_attachment_candidate(&name) {
                continue;
            }
            let (stem, ext) = split_extension(&name);
            // Files accepted via the numeric-suffix condition but with an
            // unrecognized extension default to image, the common case for
            // extensionless Takeout MMS blobs.
            let media = ext
                .and_then(media_type_for_extension)
                .unwrap_or(MediaType::Image);
            by_stem.insert(stem.to_string(), (path.clone(), media));
        }

        Self { by_stem }
    }

    /// Builds the mapping by listing `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut listing = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                listing.push(entry.path());
            }
        }
        listing.sort();
        Ok(Self::build(&listing))
    }

    /// Number of mapped attachment files.
    pub fn len(&self) -> usize {
        self.by_stem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }

    /// Resolves a raw markup token.
    ///
    /// Returns `None` for decoy tokens that fail the acceptance condition.
    /// A genuine reference with no matching file resolves to an orphan
    /// [`AttachmentRef`] (`resolved_path: None`); the caller records the
    /// orphan warning.
    pub fn resolve(&self, token: &str) -> Option<AttachmentRef> {
        if !is_attachment_candidate(token) {
            return None;
        }

        let (stem, ext) = split_extension(token);

        // Exact stem match first.
        if let Some((path, media)) = self.by_stem.get(stem) {
            return Some(AttachmentRef {
                token: token.to_string(),
                resolved_path: Some(path.clone()),
                media_type: Some(*media),
            });
        }

        // Takeout truncation: either side may have been cut to the limit.
        let found = self.by_stem.iter().find(|(file_stem, _)| {
            prefix_match(stem, file_stem) || prefix_match(file_stem, stem)
        });
        if let Some((_, (path, media))) = found {
            return Some(AttachmentRef {
                token: token.to_string(),
                resolved_path: Some(path.clone()),
                media_type: Some(*media),
            });
        }

        // Genuine reference, no file: orphan.
        Some(AttachmentRef {
            token: token.to_string(),
            resolved_path: None,
            media_type: ext.and_then(media_type_for_extension),
        })
    }
}

/// `shorter` matches `longer` when it is a truncated form of it.
fn prefix_match(shorter: &str, longer: &str) -> bool {
    shorter.len() >= TRUNCATION_LIMIT && longer.starts_with(shorter)
}
