//! # NDEF Message Decoder
//!
//! Decodes raw tag bytes into records and extracts record text.

use bytes::Buf;

use super::protocol::*;
use crate::error::{FeederLinkError, Result};

/// Decode a complete NDEF message
///
/// # Arguments
///
/// * `message` - Raw message bytes as read from the tag
///
/// # Returns
///
/// * `Result<Vec<NdefRecord>>` - Records in message order
///
/// # Errors
///
/// Returns error if:
/// - Message is empty or a record is truncated
/// - First record lacks the MB flag
/// - A record is chunked
/// - Bytes follow the record flagged ME, or no record is flagged ME
pub fn decode_message(message: &[u8]) -> Result<Vec<NdefRecord>> {
    if message.is_empty() {
        return Err(FeederLinkError::Ndef("Empty message".to_string()));
    }

    let mut buf = message;
    let mut records = Vec::new();

    loop {
        let header = take_u8(&mut buf, "header")?;

        if records.is_empty() && header & NDEF_FLAG_MB == 0 {
            return Err(FeederLinkError::Ndef("First record missing MB flag".to_string()));
        }
        if header & NDEF_FLAG_CF != 0 {
            return Err(FeederLinkError::Ndef("Chunked records are not supported".to_string()));
        }

        let tnf = Tnf::from_bits(header)?;
        let type_len = take_u8(&mut buf, "type length")? as usize;
        let payload_len = if header & NDEF_FLAG_SR != 0 {
            take_u8(&mut buf, "payload length")? as usize
        } else {
            if buf.remaining() < 4 {
                return Err(truncated("payload length"));
            }
            buf.get_u32() as usize
        };
        let id_len = if header & NDEF_FLAG_IL != 0 {
            take_u8(&mut buf, "id length")? as usize
        } else {
            0
        };

        let record_type = take_bytes(&mut buf, type_len, "type")?;
        let id = take_bytes(&mut buf, id_len, "id")?;
        let payload = take_bytes(&mut buf, payload_len, "payload")?;

        records.push(NdefRecord {
            tnf,
            record_type,
            id,
            payload,
        });

        if header & NDEF_FLAG_ME != 0 {
            break;
        }
        if !buf.has_remaining() {
            return Err(FeederLinkError::Ndef("Message ended without ME flag".to_string()));
        }
    }

    if buf.has_remaining() {
        return Err(FeederLinkError::Ndef(format!(
            "{} trailing bytes after last record",
            buf.remaining()
        )));
    }

    Ok(records)
}

/// Extract the text carried by a record
///
/// Well-known text records have their status byte and language code
/// stripped. Any other record type is read as raw UTF-8.
///
/// # Errors
///
/// Returns error if the text is not valid UTF-8 (or UTF-16 when flagged),
/// or the language length exceeds the payload.
pub fn record_text(record: &NdefRecord) -> Result<String> {
    if !record.is_text() {
        return String::from_utf8(record.payload.clone())
            .map_err(|e| FeederLinkError::Ndef(format!("Payload is not UTF-8: {}", e)));
    }

    let (&status, rest) = record
        .payload
        .split_first()
        .ok_or_else(|| FeederLinkError::Ndef("Text record without status byte".to_string()))?;
    let lang_len = (status & NDEF_TEXT_LANG_MASK) as usize;
    if rest.len() < lang_len {
        return Err(FeederLinkError::Ndef(format!(
            "Language length {} exceeds payload",
            lang_len
        )));
    }
    let text = &rest[lang_len..];

    if status & NDEF_TEXT_UTF16 != 0 {
        decode_utf16(text)
    } else {
        String::from_utf8(text.to_vec())
            .map_err(|e| FeederLinkError::Ndef(format!("Text is not UTF-8: {}", e)))
    }
}

/// Decode a tag message down to the text of its first record
///
/// Records after the first are ignored.
pub fn decode_first_text(message: &[u8]) -> Result<String> {
    let records = decode_message(message)?;
    let first = records
        .first()
        .ok_or_else(|| FeederLinkError::Ndef("Message has no records".to_string()))?;
    record_text(first)
}

fn decode_utf16(text: &[u8]) -> Result<String> {
    if text.len() % 2 != 0 {
        return Err(FeederLinkError::Ndef("Odd UTF-16 text length".to_string()));
    }

    let mut little_endian = false;
    let mut units: Vec<u16> = Vec::with_capacity(text.len() / 2);
    for (index, pair) in text.chunks_exact(2).enumerate() {
        if index == 0 {
            match pair {
                [0xFE, 0xFF] => continue,
                [0xFF, 0xFE] => {
                    little_endian = true;
                    continue;
                }
                _ => {}
            }
        }
        units.push(if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        });
    }

    String::from_utf16(&units)
        .map_err(|e| FeederLinkError::Ndef(format!("Text is not UTF-16: {}", e)))
}

fn take_u8(buf: &mut &[u8], field: &str) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(truncated(field));
    }
    Ok(buf.get_u8())
}

fn take_bytes(buf: &mut &[u8], len: usize, field: &str) -> Result<Vec<u8>> {
    if buf.remaining() < len {
        return Err(truncated(field));
    }
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

fn truncated(field: &str) -> FeederLinkError {
    FeederLinkError::Ndef(format!("Record truncated in {}", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndef::encoder::{encode_message, encode_text_message, text_record};

    #[test]
    fn test_decode_empty_message() {
        assert!(decode_message(&[]).is_err());
    }

    #[test]
    fn test_decode_text_message() {
        let message = encode_text_message(r#"{"a":1}"#, "en");
        let records = decode_message(&message).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0], text_record(r#"{"a":1}"#, "en"));
        assert_eq!(record_text(&records[0]).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_decode_long_record() {
        let text = "y".repeat(1000);
        let message = encode_text_message(&text, "de");
        assert_eq!(decode_first_text(&message).unwrap(), text);
    }

    #[test]
    fn test_decode_missing_mb_flag() {
        let mut message = encode_text_message("hi", "en");
        message[0] &= !NDEF_FLAG_MB;
        assert!(decode_message(&message).is_err());
    }

    #[test]
    fn test_decode_chunked_record_rejected() {
        let mut message = encode_text_message("hi", "en");
        message[0] |= NDEF_FLAG_CF;
        let err = decode_message(&message).unwrap_err();
        assert!(err.to_string().contains("Chunked"));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let message = encode_text_message("hello world", "en");
        let result = decode_message(&message[..message.len() - 3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut message = encode_text_message("hi", "en");
        message.push(0x00);
        assert!(decode_message(&message).is_err());
    }

    #[test]
    fn test_decode_missing_me_flag() {
        let mut message = encode_text_message("hi", "en");
        message[0] &= !NDEF_FLAG_ME;
        let err = decode_message(&message).unwrap_err();
        assert!(err.to_string().contains("ME"));
    }

    #[test]
    fn test_decode_multiple_records_keeps_order() {
        let records = vec![
            NdefRecord::new(Tnf::Media, b"application/json", b"[1]".to_vec()),
            text_record("second", "en"),
        ];
        let decoded = decode_message(&encode_message(&records).unwrap()).unwrap();
        assert_eq!(decoded, records);
        assert_eq!(decode_first_text(&encode_message(&records).unwrap()).unwrap(), "[1]");
    }

    #[test]
    fn test_record_text_raw_payload() {
        let record = NdefRecord::new(Tnf::Media, b"application/json", b"{}".to_vec());
        assert_eq!(record_text(&record).unwrap(), "{}");
    }

    #[test]
    fn test_record_text_invalid_utf8() {
        let record = NdefRecord::new(Tnf::Media, b"application/json", vec![0xFF, 0xFE, 0x00]);
        assert!(record_text(&record).is_err());
    }

    #[test]
    fn test_record_text_utf16_with_bom() {
        let mut payload = vec![NDEF_TEXT_UTF16 | 2, b'e', b'n', 0xFE, 0xFF];
        for unit in "ok".encode_utf16() {
            payload.extend_from_slice(&unit.to_be_bytes());
        }
        let record = NdefRecord::new(Tnf::WellKnown, NDEF_RTD_TEXT, payload);
        assert_eq!(record_text(&record).unwrap(), "ok");
    }

    #[test]
    fn test_record_text_language_overrun() {
        let record = NdefRecord::new(Tnf::WellKnown, NDEF_RTD_TEXT, vec![0x05, b'e']);
        assert!(record_text(&record).is_err());
    }
}
