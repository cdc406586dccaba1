//! # Session State Machine
//!
//! Pure transition function for a single tag exchange session.
//!
//! ```text
//!          ReadRequested / WriteRequested
//!   Idle ──────────────────────────────► Acquiring
//!                                          │ TagAcquired
//!                              ┌───────────┴───────────┐
//!                              ▼                       ▼
//!                           Reading                 Writing
//!        PayloadAccepted /     │                       │  WriteCommitted
//!        NoMessage             ▼                       ▼
//!                          Releasing ◄─────────────────┘
//!                              │ Released
//!                              ▼
//!                            Idle
//! ```
//!
//! Failures (`AcquireFailed`, `PayloadRejected`, `WriteFailed`, `Preempted`)
//! move any non-idle state to `Error(kind)`, which always continues through
//! `ReleaseStarted` to `Releasing`.

use std::fmt;

use crate::error::{ErrorKind, FeederLinkError, Result};

/// What the session was opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Acquiring(Operation),
    Reading,
    Writing,
    Releasing,
    Error(ErrorKind),
}

impl SessionState {
    /// Whether the hardware may be engaged in this state
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    /// Apply an event, returning the next state
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the event is not legal in this state.
    pub fn apply(self, event: SessionEvent) -> Result<SessionState> {
        use SessionEvent as E;
        use SessionState as S;

        let next = match (self, event) {
            (S::Idle, E::ReadRequested) => S::Acquiring(Operation::Read),
            (S::Idle, E::WriteRequested) => S::Acquiring(Operation::Write),

            (S::Acquiring(Operation::Read), E::TagAcquired) => S::Reading,
            (S::Acquiring(Operation::Write), E::TagAcquired) => S::Writing,
            (S::Acquiring(_), E::AcquireFailed(kind)) => S::Error(kind),

            (S::Reading, E::PayloadAccepted | E::NoMessage) => S::Releasing,
            (S::Reading, E::PayloadRejected(kind)) => S::Error(kind),

            (S::Writing, E::WriteCommitted) => S::Releasing,
            (S::Writing, E::WriteFailed) => S::Error(ErrorKind::WriteFailure),

            (state, E::Preempted) if state.is_active() => S::Error(ErrorKind::Cancelled),
            (S::Error(_), E::ReleaseStarted) => S::Releasing,
            (S::Releasing, E::Released) => S::Idle,

            (state, event) => {
                return Err(FeederLinkError::InvalidTransition {
                    state: state.to_string(),
                    event: format!("{:?}", event),
                })
            }
        };

        Ok(next)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("Idle"),
            SessionState::Acquiring(op) => write!(f, "Acquiring({:?})", op),
            SessionState::Reading => f.write_str("Reading"),
            SessionState::Writing => f.write_str("Writing"),
            SessionState::Releasing => f.write_str("Releasing"),
            SessionState::Error(kind) => write!(f, "Error({})", kind),
        }
    }
}

/// Discrete session events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ReadRequested,
    WriteRequested,
    TagAcquired,
    AcquireFailed(ErrorKind),
    PayloadAccepted,
    /// Tag present but carries no NDEF message
    NoMessage,
    PayloadRejected(ErrorKind),
    WriteCommitted,
    WriteFailed,
    /// A new session found this one still open
    Preempted,
    ReleaseStarted,
    Released,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[SessionEvent]) -> Result<SessionState> {
        events
            .iter()
            .try_fold(SessionState::Idle, |state, &event| state.apply(event))
    }

    #[test]
    fn test_successful_read_path() {
        let state = run(&[
            SessionEvent::ReadRequested,
            SessionEvent::TagAcquired,
            SessionEvent::PayloadAccepted,
            SessionEvent::Released,
        ])
        .unwrap();
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn test_successful_write_path() {
        let mut state = SessionState::Idle;
        state = state.apply(SessionEvent::WriteRequested).unwrap();
        assert_eq!(state, SessionState::Acquiring(Operation::Write));
        state = state.apply(SessionEvent::TagAcquired).unwrap();
        assert_eq!(state, SessionState::Writing);
        state = state.apply(SessionEvent::WriteCommitted).unwrap();
        assert_eq!(state, SessionState::Releasing);
        state = state.apply(SessionEvent::Released).unwrap();
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn test_acquire_failure_goes_through_error_to_idle() {
        let mut state = run(&[
            SessionEvent::ReadRequested,
            SessionEvent::AcquireFailed(ErrorKind::Cancelled),
        ])
        .unwrap();
        assert_eq!(state, SessionState::Error(ErrorKind::Cancelled));

        state = state.apply(SessionEvent::ReleaseStarted).unwrap();
        state = state.apply(SessionEvent::Released).unwrap();
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn test_rejected_payload() {
        let state = run(&[
            SessionEvent::ReadRequested,
            SessionEvent::TagAcquired,
            SessionEvent::PayloadRejected(ErrorKind::CorruptPayload),
        ])
        .unwrap();
        assert_eq!(state, SessionState::Error(ErrorKind::CorruptPayload));
    }

    #[test]
    fn test_write_failure() {
        let state = run(&[
            SessionEvent::WriteRequested,
            SessionEvent::TagAcquired,
            SessionEvent::WriteFailed,
        ])
        .unwrap();
        assert_eq!(state, SessionState::Error(ErrorKind::WriteFailure));
    }

    #[test]
    fn test_no_message_releases() {
        let state = run(&[
            SessionEvent::ReadRequested,
            SessionEvent::TagAcquired,
            SessionEvent::NoMessage,
        ])
        .unwrap();
        assert_eq!(state, SessionState::Releasing);
    }

    #[test]
    fn test_preempt_from_every_active_state() {
        let active = [
            SessionState::Acquiring(Operation::Read),
            SessionState::Acquiring(Operation::Write),
            SessionState::Reading,
            SessionState::Writing,
            SessionState::Releasing,
            SessionState::Error(ErrorKind::HardwareFailure),
        ];
        for state in active {
            assert_eq!(
                state.apply(SessionEvent::Preempted).unwrap(),
                SessionState::Error(ErrorKind::Cancelled),
                "preempt from {}",
                state
            );
        }
        assert!(SessionState::Idle.apply(SessionEvent::Preempted).is_err());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(SessionState::Idle.apply(SessionEvent::TagAcquired).is_err());
        assert!(SessionState::Idle.apply(SessionEvent::Released).is_err());
        assert!(SessionState::Reading.apply(SessionEvent::WriteCommitted).is_err());
        assert!(SessionState::Writing.apply(SessionEvent::PayloadAccepted).is_err());
        assert!(SessionState::Acquiring(Operation::Read)
            .apply(SessionEvent::ReadRequested)
            .is_err());

        let err = SessionState::Releasing.apply(SessionEvent::TagAcquired).unwrap_err();
        assert!(err.to_string().contains("Releasing"));
    }
}
