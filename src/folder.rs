//! IMAP folder types
//!
//! [`FolderDescriptor`] is what `LIST` reports about a folder.
//! [`FolderHandle`] tracks a folder the repository has opened, in
//! which mode, and whether it has been closed since.

use serde::Serialize;
use std::fmt;

/// A folder as reported by the server's `LIST` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderDescriptor {
    /// Full hierarchical name, e.g. `INBOX/Receipts`.
    pub name: String,
    /// Hierarchy delimiter, if the server reports one.
    pub delimiter: Option<String>,
    /// `false` for `\Noselect` containers that cannot hold messages.
    pub selectable: bool,
}

impl fmt::Display for FolderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// How a folder is opened.
///
/// `ReadOnly` maps to IMAP `EXAMINE`, `ReadWrite` to `SELECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderMode {
    ReadOnly,
    ReadWrite,
}

/// A folder opened through [`crate::MailRepository::open_folder`].
///
/// The handle must be passed back to
/// [`crate::MailRepository::close_folder`] once the caller is done.
///
/// # Examples
///
/// ```
/// use mailgrab::{FolderHandle, FolderMode};
///
/// let mut handle = FolderHandle::new("INBOX", FolderMode::ReadWrite);
/// assert!(handle.is_open());
/// assert!(handle.mark_closed());
/// assert!(!handle.mark_closed());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    name: String,
    mode: FolderMode,
    open: bool,
}

impl FolderHandle {
    /// An open handle for `name`. Only the repository should hand
    /// these out for real server folders.
    #[must_use]
    pub fn new(name: impl Into<String>, mode: FolderMode) -> Self {
        Self {
            name: name.into(),
            mode,
            open: true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn mode(&self) -> FolderMode {
        self.mode
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Flip the handle to closed. Returns `false` if it already was.
    pub const fn mark_closed(&mut self) -> bool {
        let was_open = self.open;
        self.open = false;
        was_open
    }
}

impl fmt::Display for FolderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
