//! IMAP attachment and message downloader
//!
//! Connects to an IMAP server, lists folders, searches a folder by sent
//! date and writes matching messages and their attachments to a local
//! directory under deterministic, content-addressed names. Outlook
//! `winmail.dat` (TNEF) attachments are unpacked next to the saved
//! container. Processed messages can be moved to an archive folder.
//!
//! [`run`] drives a complete [`Operation`]; [`MailRepository`] and the
//! [`extract`] functions are the building blocks it uses.

mod config;
mod connection;
mod error;
pub mod extract;
mod folder;
mod message;
pub mod naming;
mod operation;
mod report;
mod repository;
pub mod tnef;

pub use config::{ImapConfig, Security};
pub use error::{ConnectionError, Error, FolderError, Result, TnefError};
pub use folder::{FolderDescriptor, FolderHandle, FolderMode};
pub use message::{DateRange, Message};
pub use operation::{DownloadContent, DownloadRequest, Operation, run, validate_target_dir};
pub use report::{Event, MessageSummary, Reporter};
pub use repository::MailRepository;
