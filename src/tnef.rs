//! TNEF (`winmail.dat`) decoding
//!
//! Outlook wraps the real attachments of some messages in a single
//! `application/ms-tnef` part. The stream is a signature, a legacy key
//! and a flat list of attributes:
//!
//! ```text
//! u32 signature (0x223E9F78)  u16 key
//! repeat { u8 level  u32 id  u32 len  [len bytes]  u16 checksum }
//! ```
//!
//! An `attAttachRendData` attribute starts each attachment; the title,
//! data and MAPI property attributes that follow belong to it.

use crate::error::TnefError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

const SIGNATURE: u32 = 0x223E_9F78;

const LEVEL_ATTACHMENT: u8 = 0x02;

const ATT_ATTACH_REND_DATA: u32 = 0x0006_9002;
const ATT_ATTACH_TITLE: u32 = 0x0001_8010;
const ATT_ATTACH_DATA: u32 = 0x0006_800F;
const ATT_ATTACHMENT: u32 = 0x0006_9005;

const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;

const MV_FLAG: u16 = 0x1000;
const PT_STRING8: u16 = 0x001E;
const PT_UNICODE: u16 = 0x001F;
const PT_OBJECT: u16 = 0x000D;
const PT_BINARY: u16 = 0x0102;

/// One file embedded in a TNEF stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TnefAttachment {
    /// 8.3 name from `attAttachTitle`.
    pub title: Option<String>,
    /// `PR_ATTACH_LONG_FILENAME` from the MAPI properties.
    pub long_name: Option<String>,
    pub data: Option<Vec<u8>>,
}

impl TnefAttachment {
    /// Best available file name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.long_name.as_deref().or(self.title.as_deref())
    }
}

struct Attribute<'a> {
    level: u8,
    id: u32,
    data: &'a [u8],
}

/// Decode every attachment in `bytes`, in stream order.
///
/// # Errors
///
/// Fails on a missing signature, a truncated attribute or a checksum
/// mismatch.
pub fn parse(bytes: &[u8]) -> Result<Vec<TnefAttachment>, TnefError> {
    let mut cursor = Cursor::new(bytes);
    let signature = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| TnefError::BadSignature)?;
    if signature != SIGNATURE {
        return Err(TnefError::BadSignature);
    }
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| truncated(&cursor))?;

    let mut attachments: Vec<TnefAttachment> = Vec::new();
    while remaining(&cursor) > 0 {
        let attribute = read_attribute(&mut cursor)?;
        if attribute.level != LEVEL_ATTACHMENT {
            continue;
        }

        if attribute.id == ATT_ATTACH_REND_DATA || attachments.is_empty() {
            attachments.push(TnefAttachment::default());
        }
        let Some(current) = attachments.last_mut() else {
            continue;
        };

        match attribute.id {
            ATT_ATTACH_TITLE => current.title = Some(decode_string8(attribute.data)),
            ATT_ATTACH_DATA => current.data = Some(attribute.data.to_vec()),
            ATT_ATTACHMENT => {
                if let Some(name) = long_filename(attribute.data) {
                    current.long_name = Some(name);
                }
            }
            _ => {}
        }
    }

    Ok(attachments)
}

fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let len = cursor.get_ref().len();
    usize::try_from(cursor.position()).map_or(0, |pos| len.saturating_sub(pos))
}

fn truncated(cursor: &Cursor<&[u8]>) -> TnefError {
    TnefError::Truncated(cursor.position())
}

fn read_attribute<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<Attribute<'a>, TnefError> {
    let level = cursor.read_u8().map_err(|_| truncated(cursor))?;
    let id = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| truncated(cursor))?;
    let len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| truncated(cursor))?;

    let data = take(cursor, len).ok_or_else(|| truncated(cursor))?;
    let checksum = cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| truncated(cursor))?;

    let sum = data
        .iter()
        .fold(0u16, |acc, byte| acc.wrapping_add(u16::from(*byte)));
    if sum != checksum {
        return Err(TnefError::Checksum { id });
    }

    Ok(Attribute { level, id, data })
}

/// Borrow the next `len` bytes and advance past them.
fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: u32) -> Option<&'a [u8]> {
    let bytes: &'a [u8] = *cursor.get_ref();
    let start = usize::try_from(cursor.position()).ok()?;
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    let slice = bytes.get(start..end)?;
    cursor.set_position(u64::try_from(end).ok()?);
    Some(slice)
}

/// Like [`take`], then skip the padding up to a 4-byte boundary.
fn take_padded<'a>(cursor: &mut Cursor<&'a [u8]>, len: u32) -> Option<&'a [u8]> {
    let slice = take(cursor, len)?;
    let padding = (4 - len % 4) % 4;
    take(cursor, padding)?;
    Some(slice)
}

fn decode_string8(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

fn decode_unicode(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Size of a fixed-width MAPI value as stored in TNEF (padded to 4).
const fn fixed_size(prop_type: u16) -> Option<u32> {
    match prop_type {
        0x0001 => Some(0),
        0x0002 | 0x0003 | 0x0004 | 0x000A | 0x000B => Some(4),
        0x0005 | 0x0006 | 0x0007 | 0x0014 | 0x0040 => Some(8),
        0x0048 => Some(16),
        _ => None,
    }
}

const fn is_variable(prop_type: u16) -> bool {
    matches!(prop_type, PT_STRING8 | PT_UNICODE | PT_OBJECT | PT_BINARY)
}

/// Find `PR_ATTACH_LONG_FILENAME` in an `attAttachment` property block.
///
/// Returns `None` if the property is absent or the block uses a type
/// this decoder does not know how to skip.
fn long_filename(data: &[u8]) -> Option<String> {
    let mut cursor = Cursor::new(data);
    let count = cursor.read_u32::<LittleEndian>().ok()?;

    for _ in 0..count {
        let raw_type = cursor.read_u16::<LittleEndian>().ok()?;
        let prop_id = cursor.read_u16::<LittleEndian>().ok()?;
        if prop_id >= 0x8000 {
            skip_property_name(&mut cursor)?;
        }

        let prop_type = raw_type & !MV_FLAG;
        let values = if raw_type & MV_FLAG != 0 || is_variable(prop_type) {
            cursor.read_u32::<LittleEndian>().ok()?
        } else {
            1
        };

        for _ in 0..values {
            let value = if is_variable(prop_type) {
                let len = cursor.read_u32::<LittleEndian>().ok()?;
                take_padded(&mut cursor, len)?
            } else {
                take(&mut cursor, fixed_size(prop_type)?)?
            };

            if prop_id == PR_ATTACH_LONG_FILENAME {
                let name = match prop_type {
                    PT_STRING8 => decode_string8(value),
                    PT_UNICODE => decode_unicode(value),
                    _ => continue,
                };
                return Some(name).filter(|n| !n.is_empty());
            }
        }
    }
    None
}

/// Skip the GUID and ID/name of a named property.
fn skip_property_name(cursor: &mut Cursor<&[u8]>) -> Option<()> {
    take(cursor, 16)?;
    let kind = cursor.read_u32::<LittleEndian>().ok()?;
    if kind == 0 {
        cursor.read_u32::<LittleEndian>().ok()?;
    } else {
        let len = cursor.read_u32::<LittleEndian>().ok()?;
        take_padded(cursor, len)?;
    }
    Some(())
}
