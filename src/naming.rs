//! Artifact naming
//!
//! Final file names are built from the message's sent time, a hash of
//! its `Message-ID` and a hash of the bytes written, so re-running
//! against the same mailbox reproduces the same names while two
//! different payloads never share one.

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

/// Suffix used for whole-message downloads.
pub const MESSAGE_EXTENSION: &str = ".eml";

/// Placeholder timestamp component for messages with no usable date.
pub const UNDATED: &str = "undated";

/// Longest artifact name written, in bytes. Leaves room for the
/// container directory suffix under the common 255-byte `NAME_MAX`.
pub const MAX_NAME_BYTES: usize = 250;

/// Longest sanitized file name, in bytes. Leaves room for a ` (N)`
/// duplicate suffix inside container directories.
const MAX_FILENAME_BYTES: usize = 200;

/// Longer trailing `.xxx` parts are not treated as extensions.
const MAX_EXTENSION_BYTES: usize = 16;

/// Upper-case hex MD5 of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode_upper(Md5::digest(bytes))
}

/// `2024-01-31T09:05:00Z`: UTC, second precision, literal `Z`.
#[must_use]
pub fn utc_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// What follows the hash components in an artifact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind<'a> {
    /// A whole message, saved with the `.eml` extension.
    Message,
    /// An attachment, saved with `_` and its (sanitized) file name.
    Attachment(&'a str),
}

/// `{timestamp}_{identity}_{content}[_{filename}|.eml]`
///
/// `identity` is the hash of `message_id`, or `content` itself when the
/// message has no `Message-ID`. An attachment file name is shortened,
/// keeping its extension, so the result fits in [`MAX_NAME_BYTES`].
#[must_use]
pub fn artifact_name(
    sent: Option<DateTime<Utc>>,
    message_id: Option<&str>,
    content: &str,
    kind: ArtifactKind<'_>,
) -> String {
    let timestamp = sent.map_or_else(|| UNDATED.to_string(), utc_timestamp);
    let identity = message_id.map_or_else(|| content.to_string(), |id| content_hash(id.as_bytes()));

    match kind {
        ArtifactKind::Message => format!("{timestamp}_{identity}_{content}{MESSAGE_EXTENSION}"),
        ArtifactKind::Attachment(filename) => {
            let prefix = format!("{timestamp}_{identity}_{content}_");
            let budget = MAX_NAME_BYTES.saturating_sub(prefix.len());
            format!("{prefix}{}", truncate_keeping_extension(filename, budget))
        }
    }
}

/// Make an attachment's suggested file name safe to join onto a
/// directory path.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | '@' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // No hidden files, no "." or "..".
    if sanitized.starts_with('.') {
        sanitized.replace_range(..1, "_");
    }
    let sanitized = truncate_keeping_extension(&sanitized, MAX_FILENAME_BYTES);

    if sanitized.trim().is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

/// `name` cut to at most `max_bytes` bytes on a char boundary. A short
/// extension survives the cut.
fn truncate_keeping_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }
    let ext = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_BYTES => &name[dot..],
        _ => "",
    };
    if ext.len() >= max_bytes {
        return truncate_on_char_boundary(name, max_bytes).to_string();
    }
    let stem = &name[..name.len() - ext.len()];
    format!("{}{ext}", truncate_on_char_boundary(stem, max_bytes - ext.len()))
}

fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
