//! # Feeder Link Library
//!
//! Read telemetry from a feeder's NFC tag and ask it for float history.
//!
//! This library provides the data shaping, NDEF framing and session control
//! needed to exchange JSON payloads with a feeder through a single NFC tag.

pub mod config;
pub mod error;
pub mod ndef;
pub mod telemetry;
pub mod exchange;
