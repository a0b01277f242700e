//! Session FSM State Definitions

use std::fmt;

/// Request session states
///
/// ```text
/// IDLE → NEGOTIATING → NEGOTIATED → TRANSFER_INITIATED → AWAITING_MESSAGE
///                                                          ↓          ↓
///                                                       MATCHED    TIMED_OUT
///                                                          ↓ (pull)
///                                                 FETCHING → FETCHED → DONE
/// ```
///
/// `FAILED` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Negotiating,
    Negotiated,
    TransferInitiated,
    /// Suspended on the correlation channel
    AwaitingMessage,
    Matched,
    TimedOut,
    Fetching,
    Fetched,
    /// Terminal: payload returned to the caller
    Done,
    /// Terminal
    Failed,
}

impl SessionState {
    /// No more transitions possible
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Failed | SessionState::TimedOut
        )
    }

    /// Whether `self -> next` is a legal edge
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;

        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Idle, Negotiating)
                | (Negotiating, Negotiated)
                | (Negotiated, TransferInitiated)
                | (TransferInitiated, AwaitingMessage)
                | (AwaitingMessage, Matched)
                | (AwaitingMessage, TimedOut)
                | (Matched, Fetching)
                | (Matched, Done)
                | (Fetching, Fetched)
                | (Fetched, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "IDLE",
            SessionState::Negotiating => "NEGOTIATING",
            SessionState::Negotiated => "NEGOTIATED",
            SessionState::TransferInitiated => "TRANSFER_INITIATED",
            SessionState::AwaitingMessage => "AWAITING_MESSAGE",
            SessionState::Matched => "MATCHED",
            SessionState::TimedOut => "TIMED_OUT",
            SessionState::Fetching => "FETCHING",
            SessionState::Fetched => "FETCHED",
            SessionState::Done => "DONE",
            SessionState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
