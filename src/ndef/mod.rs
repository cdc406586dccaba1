//! # NDEF Module
//!
//! Implementation of the NFC Data Exchange Format used on feeder tags.
//!
//! This module handles:
//! - Record framing (short and long records, optional ids)
//! - Well-known text records (status byte + language code + text)
//! - Extracting the JSON text of the first record of a tag message

pub mod protocol;
pub mod encoder;
pub mod decoder;
