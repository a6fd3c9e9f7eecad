//! Fetched messages and date-range filters

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use mail_parser::{Addr, Address, MessageParser};

/// A message fetched from an open folder.
///
/// Holds the raw RFC 5322 bytes exactly as the server sent them, plus
/// the header fields the rest of the crate needs, parsed once.
#[derive(Debug, Clone)]
pub struct Message {
    uid: u32,
    raw: Vec<u8>,
    subject: Option<String>,
    from: Vec<String>,
    to: Vec<String>,
    sent: Option<DateTime<Utc>>,
    received: Option<DateTime<Utc>>,
    message_id: Option<String>,
}

impl Message {
    /// Parse the headers of `raw`.
    ///
    /// `received` is the server's `INTERNALDATE`, when fetched.
    pub fn from_raw(uid: u32, raw: Vec<u8>, received: Option<DateTime<Utc>>) -> Result<Self> {
        let (subject, from, to, sent, message_id) = {
            let parsed = MessageParser::default()
                .parse(raw.as_slice())
                .ok_or_else(|| Error::Parse(format!("UID {uid} is not a valid RFC 5322 message")))?;

            (
                parsed.subject().map(ToString::to_string),
                addresses(parsed.from()),
                addresses(parsed.to()),
                parsed
                    .date()
                    .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0)),
                parsed
                    .header_raw("Message-ID")
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(ToString::to_string),
            )
        };

        Ok(Self {
            uid,
            subject,
            from,
            to,
            sent,
            received,
            message_id,
            raw,
        })
    }

    #[must_use]
    pub const fn uid(&self) -> u32 {
        self.uid
    }

    /// Header and body bytes, unmodified.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn from(&self) -> &[String] {
        &self.from
    }

    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// The `Date:` header in UTC.
    #[must_use]
    pub const fn sent(&self) -> Option<DateTime<Utc>> {
        self.sent
    }

    #[must_use]
    pub const fn received(&self) -> Option<DateTime<Utc>> {
        self.received
    }

    /// Raw `Message-ID` header value, angle brackets included.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Timestamp used for naming: sent date, else the server's
    /// received date.
    #[must_use]
    pub fn naming_date(&self) -> Option<DateTime<Utc>> {
        self.sent.or(self.received)
    }

    /// Re-parse the full MIME structure.
    pub fn parse(&self) -> Result<mail_parser::Message<'_>> {
        MessageParser::default()
            .parse(self.raw.as_slice())
            .ok_or_else(|| Error::Parse(format!("UID {} is not a valid RFC 5322 message", self.uid)))
    }
}

fn addresses(address: Option<&Address<'_>>) -> Vec<String> {
    match address {
        Some(Address::List(list)) => list.iter().filter_map(format_addr).collect(),
        Some(Address::Group(groups)) => groups
            .iter()
            .flat_map(|group| group.addresses.iter())
            .filter_map(format_addr)
            .collect(),
        None => Vec::new(),
    }
}

fn format_addr(addr: &Addr<'_>) -> Option<String> {
    match (addr.name.as_deref(), addr.address.as_deref()) {
        (Some(name), Some(address)) => Some(format!("{name} <{address}>")),
        (None, Some(address)) => Some(address.to_string()),
        (Some(name), None) => Some(name.to_string()),
        (None, None) => None,
    }
}

/// Inclusive bounds on a message's sent date.
///
/// Both bounds absent means every message in the folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl DateRange {
    #[must_use]
    pub const fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self { since, until }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    /// The IMAP `SEARCH` criteria for this range.
    ///
    /// `SENTSINCE` is already inclusive. `SENTBEFORE` is exclusive, so
    /// the upper bound is shifted one day forward.
    #[must_use]
    pub fn search_query(&self) -> String {
        let mut keys = Vec::new();
        if let Some(since) = self.since {
            keys.push(format!("SENTSINCE {}", imap_date(since)));
        }
        if let Some(before) = self.until.and_then(|until| until.succ_opt()) {
            keys.push(format!("SENTBEFORE {}", imap_date(before)));
        }

        if keys.is_empty() {
            "ALL".to_string()
        } else {
            keys.join(" ")
        }
    }
}

/// RFC 3501 `date`: `1-Feb-2023`.
fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}
