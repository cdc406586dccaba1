//! # Error Types
//!
//! Custom error types for Feeder Link using `thiserror`.

use std::fmt;

use thiserror::Error;

/// Failure classes of a tag exchange session
///
/// Every failed session ends in exactly one of these kinds. Only
/// [`ErrorKind::CorruptPayload`] is surfaced to the user; the rest are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Handshake aborted by the user or by a preempting session
    Cancelled,
    /// Handshake or tag retrieval failed for any other reason
    HardwareFailure,
    /// Tag bytes are not a decodable NDEF/UTF-8/JSON payload
    CorruptPayload,
    /// JSON decoded but does not have the expected shape
    InvalidFormat,
    /// Committing a message to the tag failed
    WriteFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::HardwareFailure => "hardware failure",
            ErrorKind::CorruptPayload => "corrupt payload",
            ErrorKind::InvalidFormat => "invalid format",
            ErrorKind::WriteFailure => "write failure",
        };
        f.write_str(name)
    }
}

/// Main error type for Feeder Link
#[derive(Debug, Error)]
pub enum FeederLinkError {
    /// Tag handshake was cancelled
    #[error("NFC action cancelled")]
    Cancelled,

    /// Tag handshake or retrieval failed
    #[error("NFC hardware failure: {0}")]
    HardwareFailure(String),

    /// Payload could not be decoded
    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    /// Payload decoded but has the wrong shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Tag write failed
    #[error("NFC write failure: {0}")]
    WriteFailure(String),

    /// NDEF framing errors
    #[error("NDEF error: {0}")]
    Ndef(String),

    /// Session state machine received an event it cannot handle
    #[error("Invalid session transition: {event} in state {state}")]
    InvalidTransition { state: String, event: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeederLinkError {
    /// Map this error onto the exchange failure taxonomy
    ///
    /// Returns `None` for errors that cannot come out of a tag session
    /// (configuration, state machine misuse).
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            FeederLinkError::Cancelled => Some(ErrorKind::Cancelled),
            FeederLinkError::HardwareFailure(_) => Some(ErrorKind::HardwareFailure),
            FeederLinkError::CorruptPayload(_) | FeederLinkError::Ndef(_) => {
                Some(ErrorKind::CorruptPayload)
            }
            FeederLinkError::InvalidFormat(_) => Some(ErrorKind::InvalidFormat),
            FeederLinkError::WriteFailure(_) => Some(ErrorKind::WriteFailure),
            _ => None,
        }
    }
}

/// Result type alias for Feeder Link
pub type Result<T> = std::result::Result<T, FeederLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(FeederLinkError::Cancelled.kind(), Some(ErrorKind::Cancelled));
        assert_eq!(
            FeederLinkError::Ndef("truncated".into()).kind(),
            Some(ErrorKind::CorruptPayload)
        );
        assert_eq!(
            FeederLinkError::WriteFailure("io".into()).kind(),
            Some(ErrorKind::WriteFailure)
        );
        let transition = FeederLinkError::InvalidTransition {
            state: "Idle".into(),
            event: "Released".into(),
        };
        assert_eq!(transition.kind(), None);
    }

    #[test]
    fn test_error_display() {
        let err = FeederLinkError::InvalidFormat("interval must be positive".into());
        assert_eq!(err.to_string(), "Invalid format: interval must be positive");
        assert_eq!(ErrorKind::CorruptPayload.to_string(), "corrupt payload");
    }
}
