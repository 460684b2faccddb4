//! RTP depacketization.
//!
//! Each datagram received on the RTP channel is decoded by
//! [`rtp::parse_rtp_packet`] into a [`Frame`] carrying:
//!
//! - **Payload type** (7-bit): identifies the codec (RFC 3551).
//! - **Sequence number** (16-bit, wrapping): passed through as received;
//!   no reordering or loss detection is done.
//! - **Timestamp** (32-bit): media clock, typically 90 kHz for video.
//! - **Payload**: the bytes after the 12-byte fixed header, uninterpreted.
//!
//! Codec-specific payload handling (JPEG, H.264, ...) belongs to whoever
//! consumes the frames.

pub mod rtp;

pub use rtp::{Frame, parse_rtp_packet};
