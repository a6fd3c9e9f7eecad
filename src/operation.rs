//! Run orchestration
//!
//! One [`run`] connects, performs a single [`Operation`] and
//! disconnects. Every folder opened during the run is closed and the
//! session is logged out on every exit path, including errors.

use crate::config::ImapConfig;
use crate::error::{Error, Result};
use crate::extract::{download_message, download_part, extract_attachment_parts};
use crate::folder::{FolderHandle, FolderMode};
use crate::message::{DateRange, Message};
use crate::report::{Event, Reporter};
use crate::repository::MailRepository;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a download run writes per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadContent {
    Attachments,
    /// Attachments plus the whole message as `.eml`.
    AttachmentsAndMessage,
    Messages,
}

impl DownloadContent {
    const fn includes_attachments(self) -> bool {
        matches!(self, Self::Attachments | Self::AttachmentsAndMessage)
    }

    const fn includes_message(self) -> bool {
        matches!(self, Self::AttachmentsAndMessage | Self::Messages)
    }
}

/// Parameters of a download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub folder: String,
    pub range: DateRange,
    /// Existing directory artifacts are written into.
    pub target_dir: PathBuf,
    /// Folder processed messages are moved to afterwards.
    pub archive: Option<String>,
    pub content: DownloadContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListFolders,
    ListMessages { folder: String, range: DateRange },
    Download(DownloadRequest),
}

/// Connect with `config`, perform `operation` and disconnect.
///
/// # Errors
///
/// Returns the first fatal error: an invalid target directory, a
/// connection or folder failure, an IMAP command failure or a local
/// write failure. TNEF unpack failures are reported as warnings only.
pub async fn run(
    config: &ImapConfig,
    operation: &Operation,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    if let Operation::Download(request) = operation {
        validate_target_dir(&request.target_dir)?;
    }

    let mut repo = MailRepository::new();
    repo.connect(config).await?;

    let outcome = match operation {
        Operation::ListFolders => list_folders(&mut repo, reporter).await,
        Operation::ListMessages { folder, range } => {
            list_messages(&mut repo, folder, range, reporter).await
        }
        Operation::Download(request) => download(&mut repo, request, reporter).await,
    };

    repo.disconnect().await;
    outcome
}

/// The target directory must already exist and be a directory.
///
/// # Errors
///
/// Returns [`Error::Io`] naming `dir` otherwise.
pub fn validate_target_dir(dir: &Path) -> Result<()> {
    let metadata = std::fs::metadata(dir).map_err(|e| Error::io(dir, e))?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(Error::io(
            dir,
            io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        ))
    }
}

async fn list_folders(repo: &mut MailRepository, reporter: &mut dyn Reporter) -> Result<()> {
    for folder in repo.list_folders().await? {
        reporter.report(Event::Folder(folder));
    }
    Ok(())
}

async fn list_messages(
    repo: &mut MailRepository,
    folder: &str,
    range: &DateRange,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let mut handle = repo.open_folder(folder, FolderMode::ReadOnly).await?;
    let outcome = repo.search_messages(&handle, range).await;
    repo.close_folder(&mut handle).await;

    for message in &outcome? {
        reporter.report(Event::MessageSummary(message.into()));
    }
    Ok(())
}

async fn download(
    repo: &mut MailRepository,
    request: &DownloadRequest,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    // Moving out of the source needs \Deleted flags and EXPUNGE.
    let mode = if request.archive.is_some() {
        FolderMode::ReadWrite
    } else {
        FolderMode::ReadOnly
    };
    let mut source = repo.open_folder(&request.folder, mode).await?;

    let mut archive = match &request.archive {
        Some(name) => match repo.open_folder(name, FolderMode::ReadWrite).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                repo.close_folder(&mut source).await;
                return Err(e);
            }
        },
        None => None,
    };

    let outcome = download_and_archive(repo, &source, archive.as_ref(), request, reporter).await;

    if let Some(handle) = archive.as_mut() {
        repo.close_folder(handle).await;
    }
    repo.close_folder(&mut source).await;
    outcome
}

async fn download_and_archive(
    repo: &mut MailRepository,
    source: &FolderHandle,
    archive: Option<&FolderHandle>,
    request: &DownloadRequest,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let messages = repo.search_messages(source, &request.range).await?;

    let mut processed = Vec::new();
    for message in messages {
        reporter.report(Event::MessageSummary((&message).into()));
        if process_message(&message, request, reporter)? {
            processed.push(message);
        }
    }

    let Some(destination) = archive else {
        reporter.report(Event::ArchiveSkipped);
        return Ok(());
    };
    repo.move_messages(&processed, source, destination).await?;
    info!("Archived {} messages to {}", processed.len(), destination);
    reporter.report(Event::Archived {
        count: processed.len(),
        destination: destination.name().to_string(),
    });
    Ok(())
}

/// Write the requested artifacts for `message`. Returns whether the
/// message counts as processed for archiving.
fn process_message(
    message: &Message,
    request: &DownloadRequest,
    reporter: &mut dyn Reporter,
) -> Result<bool> {
    let dir = request.target_dir.as_path();
    let uid = message.uid();

    if request.content.includes_message() {
        let path = download_message(message, dir)?;
        reporter.report(Event::MessageDownloaded { uid, path });
    }
    if !request.content.includes_attachments() {
        return Ok(true);
    }

    let parts = extract_attachment_parts(message)?;
    if parts.is_empty() {
        reporter.report(Event::NoAttachments { uid });
        return Ok(false);
    }

    for part in &parts {
        let saved = download_part(part, message, dir)?;
        reporter.report(Event::AttachmentDownloaded {
            uid,
            path: saved.path.clone(),
        });
        match saved.container {
            Some(Ok(files)) => reporter.report(Event::ContainerUnpacked {
                uid,
                container: saved.path,
                files,
            }),
            Some(Err(e)) => {
                warn!("UID {uid}: {e}");
                reporter.report(Event::Warning {
                    message: format!("could not unpack {}: {e}", saved.path.display()),
                });
            }
            None => {}
        }
    }
    Ok(true)
}
