//! Network transport layer for RTSP signaling and RTP media reception.
//!
//! RTSP uses a split transport model:
//!
//! - **TCP** ([`tcp`]): carries RTSP request/response signaling. One
//!   blocking, half-duplex exchange at a time.
//!
//! - **UDP** ([`udp`]): carries RTP media packets from the server to the
//!   port the client announced during SETUP.
//!
//! - **Receiver** ([`receiver`]): a thread draining the UDP socket while
//!   the session is playing.
//!
//! Future: interleaved TCP transport (RFC 2326 §10.12) would carry RTP
//! on the control connection using `$` framing.

pub mod receiver;
pub mod tcp;
pub mod udp;

pub use receiver::RtpReceiver;
pub use tcp::ControlChannel;
pub use udp::RtpChannel;
