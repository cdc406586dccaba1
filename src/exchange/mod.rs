//! # Tag Exchange Module
//!
//! Single-shot NFC sessions against feeder tags.
//!
//! This module handles:
//! - The session state machine (acquire, read or write, release)
//! - The transport seam to the NFC hardware (or a tag image file)
//! - Building float range requests written back to the tag
//! - Reporting results and failures to the presentation layer

pub mod session;
pub mod transport;
pub mod observer;
pub mod request;
pub mod controller;
