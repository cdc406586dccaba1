//! # NDEF Protocol Constants and Types
//!
//! Core definitions for NFC Data Exchange Format messages.
//!
//! Record layout:
//! ```text
//! header(1) | type_len(1) | payload_len(1 or 4) | [id_len(1)] | type | [id] | payload
//! ```

use crate::error::{FeederLinkError, Result};

/// Message Begin flag
pub const NDEF_FLAG_MB: u8 = 0x80;

/// Message End flag
pub const NDEF_FLAG_ME: u8 = 0x40;

/// Chunk flag (chunked records are not supported)
pub const NDEF_FLAG_CF: u8 = 0x20;

/// Short Record flag (1-byte payload length)
pub const NDEF_FLAG_SR: u8 = 0x10;

/// ID Length present flag
pub const NDEF_FLAG_IL: u8 = 0x08;

/// Mask selecting the TNF bits of the header
pub const NDEF_TNF_MASK: u8 = 0x07;

/// Largest payload that fits a short record
pub const NDEF_SHORT_RECORD_MAX: usize = 255;

/// Well-known RTD type of a text record
pub const NDEF_RTD_TEXT: &[u8] = b"T";

/// Text record status byte: UTF-16 encoding bit
pub const NDEF_TEXT_UTF16: u8 = 0x80;

/// Text record status byte: language code length bits
pub const NDEF_TEXT_LANG_MASK: u8 = 0x3F;

/// Type Name Format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tnf {
    Empty,
    WellKnown,
    Media,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
}

impl Tnf {
    /// Decode the 3 TNF bits of a record header
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits & NDEF_TNF_MASK {
            0x00 => Ok(Tnf::Empty),
            0x01 => Ok(Tnf::WellKnown),
            0x02 => Ok(Tnf::Media),
            0x03 => Ok(Tnf::AbsoluteUri),
            0x04 => Ok(Tnf::External),
            0x05 => Ok(Tnf::Unknown),
            0x06 => Ok(Tnf::Unchanged),
            other => Err(FeederLinkError::Ndef(format!("Reserved TNF value: 0x{:02X}", other))),
        }
    }

    /// TNF bits for a record header
    pub fn bits(self) -> u8 {
        match self {
            Tnf::Empty => 0x00,
            Tnf::WellKnown => 0x01,
            Tnf::Media => 0x02,
            Tnf::AbsoluteUri => 0x03,
            Tnf::External => 0x04,
            Tnf::Unknown => 0x05,
            Tnf::Unchanged => 0x06,
        }
    }
}

/// A single NDEF record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    /// Type Name Format
    pub tnf: Tnf,

    /// Record type (e.g. `T` for well-known text)
    pub record_type: Vec<u8>,

    /// Optional record identifier
    pub id: Vec<u8>,

    /// Record payload
    pub payload: Vec<u8>,
}

impl NdefRecord {
    /// Create a record without an identifier
    pub fn new(tnf: Tnf, record_type: &[u8], payload: Vec<u8>) -> Self {
        Self {
            tnf,
            record_type: record_type.to_vec(),
            id: Vec::new(),
            payload,
        }
    }

    /// Whether this is a well-known text record
    pub fn is_text(&self) -> bool {
        self.tnf == Tnf::WellKnown && self.record_type == NDEF_RTD_TEXT
    }
}
