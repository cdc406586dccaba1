//! # NDEF Message Encoder
//!
//! Encodes records into a tag-ready NDEF message.

use bytes::{BufMut, BytesMut};

use super::protocol::*;
use crate::error::{FeederLinkError, Result};

/// Encode records into a complete NDEF message
///
/// The first record gets the MB flag and the last one the ME flag. Records
/// with payloads of at most 255 bytes are written as short records.
///
/// # Arguments
///
/// * `records` - Records in message order
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Raw message bytes
///
/// # Errors
///
/// Returns `Ndef` if a record type or id is longer than 255 bytes, or a
/// payload longer than `u32::MAX` bytes.
pub fn encode_message(records: &[NdefRecord]) -> Result<Vec<u8>> {
    for record in records {
        if record.record_type.len() > u8::MAX as usize {
            return Err(oversize("record type", record.record_type.len()));
        }
        if record.id.len() > u8::MAX as usize {
            return Err(oversize("record id", record.id.len()));
        }
        if u32::try_from(record.payload.len()).is_err() {
            return Err(oversize("payload", record.payload.len()));
        }
    }
    Ok(encode_records(records))
}

/// Frame records whose field lengths are already known to fit
fn encode_records(records: &[NdefRecord]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    let last = records.len().saturating_sub(1);

    for (index, record) in records.iter().enumerate() {
        let mut header = record.tnf.bits();
        if index == 0 {
            header |= NDEF_FLAG_MB;
        }
        if index == last {
            header |= NDEF_FLAG_ME;
        }
        let short = record.payload.len() <= NDEF_SHORT_RECORD_MAX;
        if short {
            header |= NDEF_FLAG_SR;
        }
        if !record.id.is_empty() {
            header |= NDEF_FLAG_IL;
        }

        buf.put_u8(header);
        buf.put_u8(record.record_type.len() as u8);
        if short {
            buf.put_u8(record.payload.len() as u8);
        } else {
            buf.put_u32(record.payload.len() as u32);
        }
        if !record.id.is_empty() {
            buf.put_u8(record.id.len() as u8);
        }
        buf.put_slice(&record.record_type);
        buf.put_slice(&record.id);
        buf.put_slice(&record.payload);
    }

    buf.to_vec()
}

fn oversize(field: &str, len: usize) -> FeederLinkError {
    FeederLinkError::Ndef(format!("{} too long for an NDEF record: {} bytes", field, len))
}

/// Build a well-known UTF-8 text record
///
/// Payload layout: status byte (language length) + language code + text.
///
/// # Arguments
///
/// * `text` - Record text
/// * `language` - IANA language code, e.g. `en` (at most 63 bytes)
pub fn text_record(text: &str, language: &str) -> NdefRecord {
    let lang = &language.as_bytes()[..language.len().min(NDEF_TEXT_LANG_MASK as usize)];

    let mut payload = Vec::with_capacity(1 + lang.len() + text.len());
    payload.push(lang.len() as u8);
    payload.extend_from_slice(lang);
    payload.extend_from_slice(text.as_bytes());

    NdefRecord::new(Tnf::WellKnown, NDEF_RTD_TEXT, payload)
}

/// Encode a message holding a single text record
///
/// # Examples
///
/// ```
/// use feeder_link::ndef::encoder::encode_text_message;
///
/// let message = encode_text_message("{}", "en");
/// assert_eq!(message[0], 0xD1);
/// ```
pub fn encode_text_message(text: &str, language: &str) -> Vec<u8> {
    // Type is `T`, there is no id, and the language is capped at 63 bytes
    encode_records(&[text_record(text, language)])
}
