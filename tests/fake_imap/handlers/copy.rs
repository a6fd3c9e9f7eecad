//! UID COPY: duplicate messages into another folder under new UIDs.

use super::Selected;
use super::uids::expand;
use crate::fake_imap::io::Reply;
use crate::fake_imap::mailbox::{Mailbox, TestEmail};
use imap_codec::imap_types::sequence::SequenceSet;

pub fn handle_uid_copy(
    tag: &str,
    sequence_set: &SequenceSet,
    destination: &str,
    mailbox: &mut Mailbox,
    selected: Option<&Selected>,
) -> Reply {
    let Some(source) = selected.and_then(|s| mailbox.get_folder(&s.folder)) else {
        return Reply::new().line(format!("{tag} BAD No folder selected"));
    };

    let max_uid = source.emails.iter().map(|e| e.uid).max().unwrap_or(0);
    let uids = expand(sequence_set, max_uid);
    let copies: Vec<Vec<u8>> = source
        .emails
        .iter()
        .filter(|e| uids.contains(&e.uid))
        .map(|e| e.raw.clone())
        .collect();

    let Some(target) = mailbox
        .get_folder_mut(destination)
        .filter(|f| f.selectable)
    else {
        return Reply::new().line(format!("{tag} NO [TRYCREATE] No such folder"));
    };

    for raw in copies {
        target.emails.push(TestEmail {
            uid: target.next_uid,
            deleted: false,
            fetch_fails: false,
            raw,
        });
        target.next_uid += 1;
    }
    Reply::new().line(format!("{tag} OK COPY completed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::test_support::{raw, writable};
    use crate::fake_imap::mailbox::MailboxBuilder;
    use imap_codec::imap_types::sequence::{SeqOrUid, Sequence};
    use std::num::NonZeroU32;

    fn uids(list: &[u32]) -> SequenceSet {
        SequenceSet(
            list.iter()
                .map(|n| Sequence::Single(SeqOrUid::Value(NonZeroU32::new(*n).unwrap())))
                .collect::<Vec<_>>()
                .try_into()
                .unwrap(),
        )
    }

    fn mailbox() -> Mailbox {
        MailboxBuilder::new()
            .folder("INBOX")
            .email(1, &raw("Sun, 1 Jan 2023 09:00:00 +0000"))
            .email(2, &raw("Sun, 15 Jan 2023 09:00:00 +0000"))
            .folder("Archive")
            .email(7, &raw("Sun, 1 Jan 2023 09:00:00 +0000"))
            .build()
    }

    #[test]
    fn copies_get_fresh_uids_and_originals_stay() {
        let mut mb = mailbox();
        let text = handle_uid_copy("A1", &uids(&[1, 2]), "Archive", &mut mb, Some(&writable("INBOX")))
            .text();
        assert_eq!(text, "A1 OK COPY completed\r\n");
        assert_eq!(mb.uids("Archive"), vec![7, 8, 9]);
        assert_eq!(mb.uids("INBOX"), vec![1, 2]);
    }

    #[test]
    fn missing_destination_is_trycreate() {
        let mut mb = mailbox();
        let text = handle_uid_copy("A1", &uids(&[1]), "Nope", &mut mb, Some(&writable("INBOX")))
            .text();
        assert!(text.starts_with("A1 NO [TRYCREATE]"));
    }
}
