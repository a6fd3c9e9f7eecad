//! UID FETCH: UID, INTERNALDATE and the full body as a literal.
//!
//! ```text
//! * 2 FETCH (UID 9 INTERNALDATE "15-Jan-2023 09:00:00 +0000" BODY[] {312}
//! <312 bytes>
//! )
//! ```
//!
//! The requested item list is ignored; every fetch gets the same
//! items. A set touching a message marked `fetch_fails` gets `NO` and
//! no data.

use super::Selected;
use super::uids::expand;
use crate::fake_imap::io::Reply;
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::sequence::SequenceSet;

pub fn handle_uid_fetch(
    tag: &str,
    sequence_set: &SequenceSet,
    mailbox: &Mailbox,
    selected: Option<&Selected>,
) -> Reply {
    let Some(folder) = selected.and_then(|s| mailbox.get_folder(&s.folder)) else {
        return Reply::new().line(format!("{tag} BAD No folder selected"));
    };

    let max_uid = folder.emails.iter().map(|e| e.uid).max().unwrap_or(0);
    let uids = expand(sequence_set, max_uid);
    if folder
        .emails
        .iter()
        .any(|e| e.fetch_fails && uids.contains(&e.uid))
    {
        return Reply::new().line(format!("{tag} NO Fetch failed"));
    }

    let mut reply = Reply::new();
    for uid in uids {
        let Some((idx, email)) = folder.emails.iter().enumerate().find(|(_, e)| e.uid == uid)
        else {
            continue;
        };

        let internal_date = email
            .date()
            .map(|d| format!(" INTERNALDATE \"{}\"", d.format("%d-%b-%Y %H:%M:%S %z")))
            .unwrap_or_default();
        reply = reply
            .line(format!(
                "* {} FETCH (UID {uid}{internal_date} BODY[] {{{}}}",
                idx + 1,
                email.raw.len()
            ))
            .bytes(&email.raw)
            .line(")");
    }
    reply.line(format!("{tag} OK FETCH completed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::test_support::{raw, read_only};
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

    #[test]
    fn body_is_sent_as_literal() {
        let body = raw("Sun, 15 Jan 2023 09:00:00 +0000");
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(3, &body)
            .email(9, &body)
            .build();

        let text = handle_uid_fetch("A1", &uid_set(9), &mailbox, Some(&read_only("INBOX"))).text();
        let header = format!(
            "* 2 FETCH (UID 9 INTERNALDATE \"15-Jan-2023 09:00:00 +0000\" BODY[] {{{}}}\r\n",
            body.len()
        );
        assert!(text.starts_with(&header));
        assert!(text.contains("Subject: Test"));
        assert!(text.ends_with(")\r\nA1 OK FETCH completed\r\n"));
    }

    #[test]
    fn failing_message_answers_no() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(1, &raw("Sun, 15 Jan 2023 09:00:00 +0000"))
            .failing_fetch()
            .build();
        let text = handle_uid_fetch("A1", &uid_set(1), &mailbox, Some(&read_only("INBOX"))).text();
        assert_eq!(text, "A1 NO Fetch failed\r\n");
    }

    #[test]
    fn unknown_uid_returns_nothing() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let text = handle_uid_fetch("A1", &uid_set(5), &mailbox, Some(&read_only("INBOX"))).text();
        assert_eq!(text, "A1 OK FETCH completed\r\n");
    }
}
