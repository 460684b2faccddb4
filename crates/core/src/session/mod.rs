//! Client-side RTSP session model (RFC 2326 §A.1).
//!
//! The client walks a small state machine, driven by
//! [`Connection`](crate::Connection):
//!
//! ```text
//! connect          -> Init
//! SETUP            -> Ready     (from Init)
//! PLAY             -> Playing   (from Ready, starts the RTP receiver)
//! PAUSE            -> Ready     (from Playing, stops the RTP receiver)
//! TEARDOWN         -> Init      (from Ready or Playing, releases the RTP socket)
//! close            -> Closed    (from anywhere)
//! ```
//!
//! Frames and receive-side errors leave the client through a
//! caller-supplied [`SessionListener`].

pub mod transport;

use std::fmt;

use crate::error::ErrorKind;
use crate::media::Frame;
pub use transport::TransportHeader;

/// RTSP client state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Control channel open, no stream set up.
    Init,
    /// SETUP succeeded; RTP socket bound, not receiving.
    Ready,
    /// PLAY succeeded; the RTP receiver is running.
    Playing,
    /// `close` was called. Nothing further is accepted.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::Ready => write!(f, "READY"),
            Self::Playing => write!(f, "PLAYING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Receiver of everything the connection produces asynchronously.
///
/// [`deliver_frame`](Self::deliver_frame) runs on the RTP receiver thread,
/// never on the caller's thread. Callbacks run without the connection lock
/// held, so both may call back into the [`Connection`](crate::Connection).
/// A `pause`, `teardown` or `close` issued from `deliver_frame` returns
/// without waiting for the receiver thread, which exits once the callback
/// returns.
pub trait SessionListener: Send + Sync {
    /// Called once per datagram received while playing.
    fn deliver_frame(&self, frame: Frame);

    /// Called on a protocol or I/O failure detected by the connection.
    /// The connection does not retry.
    fn report_error(&self, kind: ErrorKind, message: &str);

    /// Stream name to put on PLAY, PAUSE and TEARDOWN request lines.
    ///
    /// `None` reuses the name passed to SETUP.
    fn current_stream_name(&self) -> Option<String> {
        None
    }
}
