//! RTSP protocol implementation (client side of RFC 2326).
//!
//! This module handles the text-based RTSP signaling protocol: building
//! requests and parsing the server's responses.
//!
//! ## Exchange format
//!
//! Every exchange is one request followed by one response, strictly
//! half-duplex:
//!
//! ```text
//! C -> S: PLAY movie.Mjpeg RTSP/1.0\r\n
//!         CSeq: 2\r\n
//!         Session: 123456\r\n
//!         \r\n
//!
//! S -> C: RTSP/1.0 200 OK\r\n
//!         CSeq: 2\r\n
//!         Session: 123456\r\n
//!         \r\n
//! ```
//!
//! A successful response is always exactly four lines. Any other status is
//! read as the status line alone; no `Content-Length` body is consumed.
//!
//! ## Supported methods
//!
//! | Method | RFC section | Purpose |
//! |--------|-------------|---------|
//! | SETUP | §10.4 | Announce the client RTP port, obtain a session |
//! | PLAY | §10.5 | Start media delivery |
//! | PAUSE | §10.6 | Suspend media delivery |
//! | TEARDOWN | §10.7 | Release the stream, keep the control channel |

pub mod request;
pub mod response;

use std::fmt;

pub use request::{CSeqCounter, RtspRequest};
pub use response::RtspResponse;

/// Protocol version written on every request line.
pub const RTSP_VERSION: &str = "RTSP/1.0";

/// RTSP methods issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Setup,
    Play,
    Pause,
    Teardown,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Teardown => "TEARDOWN",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
