//! # Telemetry Module
//!
//! Pure data shaping for feeder tag payloads.
//!
//! This module handles:
//! - Classifying decoded tag JSON into known payload variants
//! - Reshaping flat dot-delimited telemetry into grouped display models
//! - Expanding compact float series into timestamped samples

pub mod snapshot;
pub mod reshape;
pub mod series;
pub mod payload;
