//! UID STORE for the `\Deleted` flag.
//!
//! Other flags are accepted and ignored. `.SILENT` suppresses the
//! per-message FETCH responses.

use super::Selected;
use super::uids::expand;
use crate::fake_imap::io::Reply;
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::flag::{Flag, StoreResponse, StoreType};
use imap_codec::imap_types::sequence::SequenceSet;

pub struct StoreArgs<'a> {
    pub sequence_set: &'a SequenceSet,
    pub kind: &'a StoreType,
    pub response: &'a StoreResponse,
    pub flags: &'a [Flag<'a>],
}

pub fn handle_uid_store(
    tag: &str,
    args: &StoreArgs<'_>,
    mailbox: &mut Mailbox,
    selected: Option<&Selected>,
) -> Reply {
    let Some(current) = selected else {
        return Reply::new().line(format!("{tag} BAD No folder selected"));
    };
    if current.read_only {
        return Reply::new().line(format!("{tag} NO Folder is read-only"));
    }
    let Some(folder) = mailbox.get_folder_mut(&current.folder) else {
        return Reply::new().line(format!("{tag} NO Folder not found"));
    };

    let names_deleted = args.flags.iter().any(|f| matches!(f, Flag::Deleted));
    let max_uid = folder.emails.iter().map(|e| e.uid).max().unwrap_or(0);
    let uids = expand(args.sequence_set, max_uid);

    let mut reply = Reply::new();
    for (idx, email) in folder.emails.iter_mut().enumerate() {
        if !uids.contains(&email.uid) {
            continue;
        }
        email.deleted = match args.kind {
            StoreType::Add => email.deleted || names_deleted,
            StoreType::Remove => email.deleted && !names_deleted,
            StoreType::Replace => names_deleted,
        };
        if !matches!(args.response, StoreResponse::Silent) {
            let flags = if email.deleted { "\\Deleted" } else { "" };
            reply = reply.line(format!("* {} FETCH (UID {} FLAGS ({flags}))", idx + 1, email.uid));
        }
    }
    reply.line(format!("{tag} OK STORE completed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::test_support::{raw, read_only, writable};
    use crate::fake_imap::mailbox::MailboxBuilder;
    use imap_codec::imap_types::sequence::{SeqOrUid, Sequence};
    use std::num::NonZeroU32;

    fn uid_set(uid: u32) -> SequenceSet {
        SequenceSet(
            vec![Sequence::Single(SeqOrUid::Value(NonZeroU32::new(uid).unwrap()))]
                .try_into()
                .unwrap(),
        )
    }

    fn mailbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .email(1, &raw("Sun, 1 Jan 2023 09:00:00 +0000"))
            .email(2, &raw("Sun, 1 Jan 2023 09:00:00 +0000"))
            .build()
    }

    fn store(mb: &mut Mailbox, kind: &StoreType, response: &StoreResponse, selected: &Selected) -> String {
        let set = uid_set(2);
        let flags = [Flag::Deleted];
        let args = StoreArgs {
            sequence_set: &set,
            kind,
            response,
            flags: &flags,
        };
        handle_uid_store("A1", &args, mb, Some(selected)).text()
    }

    #[test]
    fn silent_add_marks_deleted() {
        let mut mb = mailbox();
        let text = store(&mut mb, &StoreType::Add, &StoreResponse::Silent, &writable("INBOX"));
        assert_eq!(text, "A1 OK STORE completed\r\n");

        let emails = &mb.get_folder("INBOX").unwrap().emails;
        assert!(!emails[0].deleted);
        assert!(emails[1].deleted);
    }

    #[test]
    fn answer_reports_flags() {
        let mut mb = mailbox();
        let text = store(&mut mb, &StoreType::Add, &StoreResponse::Answer, &writable("INBOX"));
        assert!(text.starts_with("* 2 FETCH (UID 2 FLAGS (\\Deleted))\r\n"));

        store(&mut mb, &StoreType::Remove, &StoreResponse::Silent, &writable("INBOX"));
        assert!(!mb.get_folder("INBOX").unwrap().emails[1].deleted);
    }

    #[test]
    fn read_only_folder_is_refused() {
        let mut mb = mailbox();
        let text = store(&mut mb, &StoreType::Add, &StoreResponse::Silent, &read_only("INBOX"));
        assert!(text.starts_with("A1 NO"));
        assert!(!mb.get_folder("INBOX").unwrap().emails[1].deleted);
    }
}
