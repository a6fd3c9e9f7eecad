//! EXPUNGE: drop every `\Deleted` message from the selected folder.
//!
//! Each removal is reported as `* N EXPUNGE`, where N is the sequence
//! number at the moment of removal, so later numbers shift down.

use super::Selected;
use crate::fake_imap::io::Reply;
use crate::fake_imap::mailbox::{Folder, Mailbox};

pub fn handle_expunge(tag: &str, mailbox: &mut Mailbox, selected: Option<&Selected>) -> Reply {
    let Some(current) = selected else {
        return Reply::new().line(format!("{tag} BAD No folder selected"));
    };
    if current.read_only {
        return Reply::new().line(format!("{tag} NO Folder is read-only"));
    }
    let Some(folder) = mailbox.get_folder_mut(&current.folder) else {
        return Reply::new().line(format!("{tag} NO Folder not found"));
    };

    let mut reply = Reply::new();
    for seq in remove_deleted(folder) {
        reply = reply.line(format!("* {seq} EXPUNGE"));
    }
    reply.line(format!("{tag} OK EXPUNGE completed"))
}

/// Remove `\Deleted` messages and return their EXPUNGE sequence
/// numbers.
pub fn remove_deleted(folder: &mut Folder) -> Vec<usize> {
    let mut seqs = Vec::new();
    let mut removed = 0;
    for (idx, email) in folder.emails.iter().enumerate() {
        if email.deleted {
            seqs.push(idx + 1 - removed);
            removed += 1;
        }
    }
    folder.emails.retain(|e| !e.deleted);
    seqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::test_support::{raw, read_only, writable};
    use crate::fake_imap::mailbox::MailboxBuilder;

    fn mailbox_with_deleted(deleted: &[u32]) -> Mailbox {
        let body = raw("Mon, 2 Jan 2023 10:00:00 +0000");
        let mut mb = MailboxBuilder::new()
            .folder("INBOX")
            .email(1, &body)
            .email(2, &body)
            .email(3, &body)
            .email(4, &body)
            .build();
        for email in &mut mb.get_folder_mut("INBOX").unwrap().emails {
            email.deleted = deleted.contains(&email.uid);
        }
        mb
    }

    #[test]
    fn sequence_numbers_shift_as_messages_go() {
        let mut mb = mailbox_with_deleted(&[2, 3]);
        let text = handle_expunge("A1", &mut mb, Some(&writable("INBOX"))).text();
        assert_eq!(text, "* 2 EXPUNGE\r\n* 2 EXPUNGE\r\nA1 OK EXPUNGE completed\r\n");
        assert_eq!(mb.uids("INBOX"), vec![1, 4]);
    }

    #[test]
    fn nothing_deleted_nothing_removed() {
        let mut mb = mailbox_with_deleted(&[]);
        let text = handle_expunge("A1", &mut mb, Some(&writable("INBOX"))).text();
        assert_eq!(text, "A1 OK EXPUNGE completed\r\n");
        assert_eq!(mb.uids("INBOX").len(), 4);
    }

    #[test]
    fn read_only_folder_is_refused() {
        let mut mb = mailbox_with_deleted(&[1]);
        let text = handle_expunge("A1", &mut mb, Some(&read_only("INBOX"))).text();
        assert!(text.starts_with("A1 NO"));
        assert_eq!(mb.uids("INBOX").len(), 4);
    }
}
