//! Attachment extraction and artifact storage
//!
//! Every artifact is written to a hidden temporary file in the target
//! directory and then renamed onto its final name, so a partially
//! written file never appears under a final name.

use crate::error::{Error, Result};
use crate::message::Message;
use crate::naming::{ArtifactKind, artifact_name, sanitize_filename};
use crate::tnef;
use mail_parser::{MimeHeaders, PartType};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Attachment name Outlook uses for TNEF containers.
pub const TNEF_CONTAINER_NAME: &str = "winmail.dat";

/// Suffix of the directory a container is unpacked into.
pub const CONTAINER_DIR_SUFFIX: &str = "_d";

/// Containers nested deeper than this are saved but not unpacked.
const MAX_CONTAINER_DEPTH: usize = 4;

/// A top-level MIME part with `Content-Disposition: attachment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    /// File name suggested by the sender, with RFC 2047/2231 encoding
    /// already decoded.
    pub filename: Option<String>,
    /// Transfer-decoded content.
    pub content: Vec<u8>,
}

impl AttachmentPart {
    /// Name safe to use inside the target directory.
    #[must_use]
    pub fn safe_filename(&self) -> String {
        sanitize_filename(self.filename.as_deref().unwrap_or_default())
    }

    #[must_use]
    pub fn is_tnef_container(&self) -> bool {
        self.filename
            .as_deref()
            .is_some_and(is_tnef_container_name)
    }
}

/// Result of [`download_part`].
#[derive(Debug)]
pub struct SavedAttachment {
    pub path: PathBuf,
    /// For `winmail.dat` parts: the files unpacked next to it, or why
    /// unpacking failed. Unpack failures never fail the download.
    pub container: Option<std::result::Result<Vec<PathBuf>, Error>>,
}

/// Top-level attachment parts of `message`, in MIME order.
///
/// A message whose root part is not multipart has none.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the raw message cannot be parsed.
pub fn extract_attachment_parts(message: &Message) -> Result<Vec<AttachmentPart>> {
    let parsed = message.parse()?;
    let PartType::Multipart(children) = &parsed.root_part().body else {
        return Ok(Vec::new());
    };

    let parts = children
        .iter()
        .filter_map(|id| parsed.parts.get(*id))
        .filter(|part| {
            part.content_disposition()
                .is_some_and(|d| d.ctype().eq_ignore_ascii_case("attachment"))
        })
        .map(|part| AttachmentPart {
            filename: part.attachment_name().map(ToString::to_string),
            content: part.contents().to_vec(),
        })
        .collect();
    Ok(parts)
}

/// Save `part` of `message` into `target_dir`.
///
/// A `winmail.dat` part is additionally unpacked into
/// `<final name>_d`.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be written or renamed.
pub fn download_part(
    part: &AttachmentPart,
    message: &Message,
    target_dir: &Path,
) -> Result<SavedAttachment> {
    let filename = part.safe_filename();
    let path = store(target_dir, &part.content, |content| {
        artifact_name(
            message.naming_date(),
            message.message_id(),
            content,
            ArtifactKind::Attachment(&filename),
        )
    })?;
    debug!("Saved attachment {} of UID {}", path.display(), message.uid());

    let container = part.is_tnef_container().then(|| {
        let unpacked = unpack_container(&part.content, &container_dir(&path), 1);
        if let Err(e) = &unpacked {
            warn!("Could not unpack {}: {e}", path.display());
        }
        unpacked
    });

    Ok(SavedAttachment { path, container })
}

/// Save the unmodified raw bytes of `message` as an `.eml` file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be written or renamed.
pub fn download_message(message: &Message, target_dir: &Path) -> Result<PathBuf> {
    let path = store(target_dir, message.raw(), |content| {
        artifact_name(
            message.naming_date(),
            message.message_id(),
            content,
            ArtifactKind::Message,
        )
    })?;
    debug!("Saved message {} of UID {}", path.display(), message.uid());
    Ok(path)
}

/// Directory a container saved at `path` is unpacked into.
#[must_use]
pub fn container_dir(path: &Path) -> PathBuf {
    let mut dir = path.as_os_str().to_owned();
    dir.push(CONTAINER_DIR_SUFFIX);
    PathBuf::from(dir)
}

fn is_tnef_container_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(TNEF_CONTAINER_NAME)
}

/// Write `bytes` to a temporary file in `dir`, then rename it to the
/// name `final_name` derives from the content hash.
fn store(dir: &Path, bytes: &[u8], final_name: impl FnOnce(&str) -> String) -> Result<PathBuf> {
    let mut temp = tempfile::Builder::new()
        .prefix(".mailgrab-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;
    temp.write_all(bytes)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| Error::io(temp.path(), e))?;

    let path = dir.join(final_name(&crate::naming::content_hash(bytes)));
    temp.persist(&path).map_err(|e| Error::io(&path, e.error))?;
    Ok(path)
}

/// Unpack a TNEF stream into `dir`, recursing into nested containers.
fn unpack_container(bytes: &[u8], dir: &Path, depth: usize) -> Result<Vec<PathBuf>> {
    let attachments = tnef::parse(bytes)?;
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let mut used = HashSet::new();
    let mut saved = Vec::new();
    for (index, attachment) in attachments.iter().enumerate() {
        let Some(data) = attachment.data.as_deref() else {
            continue;
        };
        let original = attachment
            .name()
            .map_or_else(|| format!("attachment-{}", index + 1), ToString::to_string);
        let name = unique_name(sanitize_filename(&original), &mut used);
        let path = store(dir, data, |_| name)?;

        if is_tnef_container_name(&original) {
            if depth < MAX_CONTAINER_DEPTH {
                match unpack_container(data, &container_dir(&path), depth + 1) {
                    Ok(nested) => saved.extend(nested),
                    Err(e) => warn!("Could not unpack nested {}: {e}", path.display()),
                }
            } else {
                warn!("Not unpacking {}: nested too deep", path.display());
            }
        }
        saved.push(path);
    }
    Ok(saved)
}

/// `name`, or `name (2)`, `name (3)`... if already used in this
/// container.
fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name.as_str(), ""),
    };
    (2..)
        .map(|n| format!("{stem} ({n}){ext}"))
        .find(|candidate| used.insert(candidate.clone()))
        .unwrap_or(name)
}
