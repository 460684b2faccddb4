//! Error types for the RTSP client library.

use std::fmt;

use crate::protocol::Method;
use crate::session::SessionState;

/// Errors that can occur while driving an RTSP connection.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Connection** ([`Connection`](Self::Connection)): the control channel
///   could not be opened.
/// - **Protocol** ([`Status`](Self::Status), [`Parse`](Self::Parse)): the
///   server answered with a non-200 status or a malformed response.
/// - **State** ([`State`](Self::State)): the operation is not valid in the
///   current session state.
/// - **Transport** ([`Transport`](Self::Transport)): socket failure
///   mid-exchange.
///
/// Use [`kind`](Self::kind) to branch on the failure class.
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Host resolution, refused port or unreachable server.
    #[error("could not connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server answered with something other than `200`.
    #[error("{method} failed: expected status 200, server returned {status} {reason}")]
    Status {
        method: Method,
        status: u16,
        reason: String,
    },

    /// The response could not be tokenized.
    #[error("{method} failed: malformed response: {kind}")]
    Parse { method: Method, kind: ParseErrorKind },

    /// The transition table has no entry for this method in this state.
    #[error("{method} not allowed in state {state} (valid from {})", join_states(.valid_from))]
    State {
        method: Method,
        state: SessionState,
        valid_from: &'static [SessionState],
    },

    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Transport(#[from] std::io::Error),
}

impl RtspError {
    /// The coarse failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Status { .. } | Self::Parse { .. } => ErrorKind::Protocol,
            Self::State { .. } => ErrorKind::State,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }
}

fn join_states(states: &[SessionState]) -> String {
    states
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Failure class reported to a [`SessionListener`](crate::session::SessionListener).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Protocol,
    State,
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Protocol => write!(f, "protocol"),
            Self::State => write!(f, "state"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

/// Specific kind of RTSP response parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Status line had fewer than two whitespace-separated tokens.
    MissingStatusCode,
    /// Second token of the status line was not an integer.
    InvalidStatusCode(String),
    /// Session line had fewer than two whitespace-separated tokens.
    MissingSessionId,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStatusCode => write!(f, "status line has no status code"),
            Self::InvalidStatusCode(token) => write!(f, "invalid status code {token:?}"),
            Self::MissingSessionId => write!(f, "session line has no session id"),
        }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;
