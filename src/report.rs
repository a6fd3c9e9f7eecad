//! Structured run events
//!
//! The orchestrator never prints. It emits [`Event`]s to a [`Reporter`]
//! and the caller decides how to present them.

use crate::folder::FolderDescriptor;
use crate::message::Message;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A folder returned by list-folders.
    Folder(FolderDescriptor),
    MessageSummary(MessageSummary),
    MessageDownloaded {
        uid: u32,
        path: PathBuf,
    },
    AttachmentDownloaded {
        uid: u32,
        path: PathBuf,
    },
    /// Files unpacked from a `winmail.dat` attachment.
    ContainerUnpacked {
        uid: u32,
        container: PathBuf,
        files: Vec<PathBuf>,
    },
    NoAttachments {
        uid: u32,
    },
    Archived {
        count: usize,
        destination: String,
    },
    ArchiveSkipped,
    Warning {
        message: String,
    },
}

/// Header summary of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub uid: u32,
    pub subject: Option<String>,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub sent: Option<DateTime<Utc>>,
    pub received: Option<DateTime<Utc>>,
    pub size: usize,
}

impl From<&Message> for MessageSummary {
    fn from(message: &Message) -> Self {
        Self {
            uid: message.uid(),
            subject: message.subject().map(ToString::to_string),
            from: message.from().to_vec(),
            to: message.to().to_vec(),
            sent: message.sent(),
            received: message.received(),
            size: message.size(),
        }
    }
}

/// Consumer of run events.
pub trait Reporter {
    fn report(&mut self, event: Event);
}

/// Collects events in memory.
impl Reporter for Vec<Event> {
    fn report(&mut self, event: Event) {
        self.push(event);
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, event: Event) {
        (**self).report(event);
    }
}
