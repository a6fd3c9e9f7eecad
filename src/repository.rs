//! Mail repository: one IMAP session and the folders opened on it

use crate::config::ImapConfig;
use crate::connection::{self, ImapSession};
use crate::error::{ConnectionError, Error, FolderError, Result};
use crate::folder::{FolderDescriptor, FolderHandle, FolderMode};
use crate::message::{DateRange, Message};
use async_imap::types::NameAttribute;
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

/// Owns at most one authenticated IMAP session.
///
/// IMAP allows a single selected folder per session, so the repository
/// remembers which folder is currently selected and re-selects on
/// demand when an operation targets a different open handle.
#[derive(Default)]
pub struct MailRepository {
    session: Option<ImapSession>,
    selected: Option<(String, FolderMode)>,
}

impl MailRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Log in to the server described by `config`.
    ///
    /// Does nothing if a session is already established.
    ///
    /// # Errors
    ///
    /// Returns the network, TLS or authentication failure.
    pub async fn connect(&mut self, config: &ImapConfig) -> std::result::Result<(), ConnectionError> {
        if self.is_connected() {
            debug!("Already connected, reusing session");
            return Ok(());
        }
        self.session = Some(connection::connect(config).await?);
        Ok(())
    }

    /// Log out if connected. Failures during logout are logged only.
    pub async fn disconnect(&mut self) {
        self.selected = None;
        let Some(mut session) = self.session.take() else {
            return;
        };
        match session.logout().await {
            Ok(()) => info!("Disconnected from IMAP server"),
            Err(e) => warn!("Logout failed: {e}"),
        }
    }

    /// List every folder at any depth, in server order.
    ///
    /// # Errors
    ///
    /// Returns [`FolderError::NotConnected`] without a session, or an
    /// IMAP error if `LIST` fails.
    pub async fn list_folders(&mut self) -> Result<Vec<FolderDescriptor>> {
        let session = self.session_mut()?;

        let mut folder_stream = session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| Error::Imap(format!("List folders failed: {e}")))?;

        let mut folders = Vec::new();
        while let Some(item) = folder_stream.next().await {
            let name = item.map_err(|e| Error::Imap(format!("List folders failed: {e}")))?;
            folders.push(FolderDescriptor {
                name: name.name().to_string(),
                delimiter: name.delimiter().map(ToString::to_string),
                selectable: !name
                    .attributes()
                    .iter()
                    .any(|a| matches!(a, NameAttribute::NoSelect)),
            });
        }
        Ok(folders)
    }

    /// Open the folder called exactly `name`.
    ///
    /// `INBOX` is matched case-insensitively as IMAP requires.
    ///
    /// # Errors
    ///
    /// [`FolderError::NotConnected`] without a session,
    /// [`FolderError::NotFound`] if the server has no such folder, or an
    /// IMAP error if `SELECT`/`EXAMINE` fails.
    pub async fn open_folder(&mut self, name: &str, mode: FolderMode) -> Result<FolderHandle> {
        if !self.is_connected() {
            return Err(FolderError::NotConnected.into());
        }

        let folders = self.list_folders().await?;
        let Some(found) = folders.into_iter().find(|f| same_folder(&f.name, name)) else {
            return Err(FolderError::NotFound(name.to_string()).into());
        };

        let handle = FolderHandle::new(found.name, mode);
        self.ensure_selected(&handle).await?;
        info!("Opened folder {} ({:?})", handle, mode);
        Ok(handle)
    }

    /// Close `handle` without expunging. No-op if already closed.
    pub async fn close_folder(&mut self, handle: &mut FolderHandle) {
        if !handle.mark_closed() {
            return;
        }

        let is_selected = self
            .selected
            .as_ref()
            .is_some_and(|(name, _)| name == handle.name());
        if !is_selected {
            debug!("Closed folder {}", handle);
            return;
        }
        self.selected = None;

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Err(e) = session.run_command_and_check_ok("UNSELECT").await {
            // Without UNSELECT, CLOSE only avoids expunging when the
            // folder is selected read-only.
            debug!("UNSELECT unsupported ({e}), falling back to EXAMINE + CLOSE");
            let fallback = match session.examine(handle.name()).await {
                Ok(_) => session.close().await,
                Err(e) => Err(e),
            };
            if let Err(e) = fallback {
                warn!("Failed to close folder {}: {e}", handle);
                return;
            }
        }
        debug!("Closed folder {}", handle);
    }

    /// Fetch the messages in `handle` whose sent date falls in `range`.
    ///
    /// A closed handle yields no messages. Filtering is done by the
    /// server's `SEARCH`; results are in ascending UID order. Messages
    /// returned without a body or that fail to parse are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, re-select, `SEARCH` or any
    /// `FETCH` fails.
    pub async fn search_messages(
        &mut self,
        handle: &FolderHandle,
        range: &DateRange,
    ) -> Result<Vec<Message>> {
        if !handle.is_open() {
            return Ok(Vec::new());
        }
        self.ensure_selected(handle).await?;

        let query = range.search_query();
        let session = self.session_mut()?;
        let uids = session
            .uid_search(&query)
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        info!(
            "Found {} messages in {} matching '{}'",
            uid_list.len(),
            handle,
            query
        );

        let mut messages = Vec::with_capacity(uid_list.len());
        for uid in uid_list {
            if let Some(message) = fetch_single(session, uid).await? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    /// Copy `messages` to `destination`, flag the originals `\Deleted`
    /// and expunge `source`.
    ///
    /// The expunge removes every deleted message in `source`, not only
    /// the ones moved here. The three steps are not atomic: a failure
    /// after the copy leaves the messages in both folders.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle is closed, `source` is
    /// read-only, or any of the IMAP commands fails.
    pub async fn move_messages(
        &mut self,
        messages: &[Message],
        source: &FolderHandle,
        destination: &FolderHandle,
    ) -> Result<()> {
        for handle in [source, destination] {
            if !handle.is_open() {
                return Err(FolderError::NotOpen(handle.name().to_string()).into());
            }
        }
        if source.mode() != FolderMode::ReadWrite {
            return Err(FolderError::ReadOnly(source.name().to_string()).into());
        }
        if messages.is_empty() {
            debug!("Nothing to move from {}", source);
            return Ok(());
        }

        self.ensure_selected(source).await?;
        let session = self.session_mut()?;

        let uid_set = messages
            .iter()
            .map(|m| m.uid().to_string())
            .collect::<Vec<_>>()
            .join(",");

        session
            .uid_copy(&uid_set, destination.name())
            .await
            .map_err(|e| Error::Imap(format!("Copy to {destination} failed: {e}")))?;

        session
            .uid_store(&uid_set, "+FLAGS.SILENT (\\Deleted)")
            .await
            .map_err(|e| Error::Imap(format!("Store \\Deleted failed: {e}")))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| Error::Imap(format!("Store \\Deleted failed: {e}")))?;

        let expunged = session
            .expunge()
            .await
            .map_err(|e| Error::Imap(format!("Expunge of {source} failed: {e}")))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| Error::Imap(format!("Expunge of {source} failed: {e}")))?;

        info!(
            "Moved {} messages from {} to {} ({} expunged)",
            messages.len(),
            source,
            destination,
            expunged.len()
        );
        Ok(())
    }

    // -- private helpers --

    fn session_mut(&mut self) -> std::result::Result<&mut ImapSession, FolderError> {
        self.session.as_mut().ok_or(FolderError::NotConnected)
    }

    async fn ensure_selected(&mut self, handle: &FolderHandle) -> Result<()> {
        let already = self
            .selected
            .as_ref()
            .is_some_and(|(name, mode)| name == handle.name() && *mode == handle.mode());
        if already {
            return Ok(());
        }

        let session = self.session_mut()?;
        let selected = match handle.mode() {
            FolderMode::ReadOnly => session.examine(handle.name()).await,
            FolderMode::ReadWrite => session.select(handle.name()).await,
        };
        let mailbox = selected.map_err(|e| Error::Imap(format!("Failed to select {handle}: {e}")))?;
        debug!("Selected {} ({} messages)", handle, mailbox.exists);

        self.selected = Some((handle.name().to_string(), handle.mode()));
        Ok(())
    }
}

fn same_folder(server_name: &str, requested: &str) -> bool {
    server_name == requested
        || (server_name.eq_ignore_ascii_case("INBOX") && requested.eq_ignore_ascii_case("INBOX"))
}

/// Fetch one message. A message the server returns without a body, or
/// that is not valid RFC 5322, is skipped with a warning; a failed
/// `FETCH` command is an error.
async fn fetch_single(session: &mut ImapSession, uid: u32) -> Result<Option<Message>> {
    let fetches: Vec<_> = session
        .uid_fetch(uid.to_string(), "(UID INTERNALDATE BODY.PEEK[])")
        .await
        .map_err(|e| Error::Imap(format!("Fetch of UID {uid} failed: {e}")))?
        .try_collect()
        .await
        .map_err(|e| Error::Imap(format!("Fetch of UID {uid} failed: {e}")))?;

    let Some((fetch, body)) = fetches.iter().find_map(|f| f.body().map(|b| (f, b))) else {
        warn!("No body returned for UID {uid}, skipping");
        return Ok(None);
    };

    let received = fetch.internal_date().map(|d| d.to_utc());
    match Message::from_raw(uid, body.to_vec(), received) {
        Ok(message) => Ok(Some(message)),
        Err(e) => {
            warn!("Skipping UID {uid}: {e}");
            Ok(None)
        }
    }
}
