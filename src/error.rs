//! Error types for mailgrab

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Folder error: {0}")]
    Folder(#[from] FolderError),

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Email parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TNEF extraction error: {0}")]
    Extraction(#[from] TnefError),
}

impl Error {
    /// Attach the path being written or read to an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure to establish an authenticated IMAP session.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("cannot reach {addr}: {source}")]
    Network {
        addr: String,
        source: std::io::Error,
    },

    #[error("TLS negotiation failed: {0}")]
    Tls(String),

    #[error("login failed for {user}: {reason}")]
    Authentication { user: String, reason: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FolderError {
    #[error("not connected to the IMAP server")]
    NotConnected,

    #[error("folder '{0}' does not exist")]
    NotFound(String),

    #[error("folder '{0}' is not open")]
    NotOpen(String),

    #[error("folder '{0}' is open read-only")]
    ReadOnly(String),
}

/// Malformed or unsupported TNEF (`winmail.dat`) stream.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TnefError {
    #[error("missing TNEF signature")]
    BadSignature,

    #[error("stream truncated at offset {0}")]
    Truncated(u64),

    #[error("checksum mismatch for attribute 0x{id:08X}")]
    Checksum { id: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
