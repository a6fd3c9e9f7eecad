//! IMAP command handlers for the fake server.
//!
//! Handlers are synchronous: they run under the mailbox lock and return
//! a complete [`Reply`](super::io::Reply) for the connection loop to
//! send.

mod copy;
mod expunge;
mod fetch;
mod store;

pub use copy::handle_uid_copy;
pub use expunge::handle_expunge;
pub use fetch::handle_uid_fetch;
pub use list::handle_list;
pub use search::handle_uid_search;
pub use select::{handle_close, handle_select, handle_unselect};
pub use session::{handle_capability, handle_login, handle_logout, handle_noop};
pub use store::{StoreArgs, handle_uid_store};

/// The folder chosen by SELECT or EXAMINE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub folder: String,
    pub read_only: bool,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Selected;

    pub fn raw(date: &str) -> Vec<u8> {
        format!("From: a@b.com\r\nDate: {date}\r\nSubject: Test\r\n\r\nBody").into_bytes()
    }

    pub fn writable(folder: &str) -> Selected {
        Selected {
            folder: folder.to_string(),
            read_only: false,
        }
    }

    pub fn read_only(folder: &str) -> Selected {
        Selected {
            folder: folder.to_string(),
            read_only: true,
        }
    }
}
