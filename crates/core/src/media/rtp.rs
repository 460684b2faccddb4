/// Length of the RTP fixed header (RFC 3550 §5.1) without CSRC entries.
pub const RTP_HEADER_LEN: usize = 12;

const PAYLOAD_TYPE_MASK: u8 = 0x7F;

/// One decoded RTP packet.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Sequence number and timestamp are stored signed so that a datagram
/// too short to carry a header can be represented with `-1` sentinels.
/// Use [`sequence`](Self::sequence) and [`rtp_timestamp`](Self::rtp_timestamp)
/// for the unsigned wire values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// RTP payload type (7-bit, RFC 3551).
    pub payload_type: u8,
    /// Marker bit. Never extracted from the header; always `false`.
    pub marker: bool,
    pub sequence_number: i16,
    pub timestamp: i32,
    /// Packet bytes after the 12-byte fixed header.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Sequence number as the unsigned 16-bit wire value.
    pub fn sequence(&self) -> u16 {
        self.sequence_number as u16
    }

    /// Timestamp as the unsigned 32-bit wire value.
    pub fn rtp_timestamp(&self) -> u32 {
        self.timestamp as u32
    }
}

/// Decode a raw datagram into a [`Frame`].
///
/// Fields are read big-endian from the fixed header. CSRC entries, header
/// extensions and padding are not interpreted: everything after byte 12 is
/// payload. A datagram shorter than the fixed header decodes to an empty
/// payload with payload type `0` and sequence number and timestamp `-1`.
pub fn parse_rtp_packet(packet: &[u8]) -> Frame {
    if packet.len() < RTP_HEADER_LEN {
        return Frame {
            payload_type: 0,
            marker: false,
            sequence_number: -1,
            timestamp: -1,
            payload: Vec::new(),
        };
    }

    let version = packet[0] >> 6;
    if version != 2 {
        tracing::trace!(version, "unexpected RTP version");
    }

    // TODO: read the marker from bit 7 of byte 1 once receivers rely on frame boundaries.
    Frame {
        payload_type: packet[1] & PAYLOAD_TYPE_MASK,
        marker: false,
        sequence_number: u16::from_be_bytes([packet[2], packet[3]]) as i16,
        timestamp: u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]) as i32,
        payload: packet[RTP_HEADER_LEN..].to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_header_and_payload() {
        let packet = [
            0x80, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x64, 0, 0, 0, 0, 0xAA, 0xBB,
        ];
        let frame = parse_rtp_packet(&packet);
        assert_eq!(frame.payload_type, 96);
        assert_eq!(frame.sequence_number, 1);
        assert_eq!(frame.timestamp, 100);
        assert_eq!(frame.payload, vec![0xAA, 0xBB]);
        assert!(!frame.marker);
    }

    #[test]
    fn short_datagram_yields_sentinels() {
        let frame = parse_rtp_packet(&[0x80, 0x60, 0x00]);
        assert_eq!(frame.payload_type, 0);
        assert_eq!(frame.sequence_number, -1);
        assert_eq!(frame.timestamp, -1);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn empty_datagram_yields_sentinels() {
        let frame = parse_rtp_packet(&[]);
        assert_eq!(frame.sequence_number, -1);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn header_only_has_empty_payload() {
        let packet = [0x80, 0x1A, 0x12, 0x34, 0, 0, 0x0B, 0xB8, 1, 2, 3, 4];
        let frame = parse_rtp_packet(&packet);
        assert_eq!(frame.payload_type, 26);
        assert_eq!(frame.sequence(), 0x1234);
        assert_eq!(frame.rtp_timestamp(), 3000);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn marker_bit_not_extracted() {
        let packet = [0x80, 0xE0, 0, 5, 0, 0, 0, 1, 0, 0, 0, 0];
        let frame = parse_rtp_packet(&packet);
        assert_eq!(frame.payload_type, 96);
        assert!(!frame.marker);
    }

    #[test]
    fn high_values_wrap_into_signed_storage() {
        let packet = [0x80, 0x60, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0, 0, 0, 0];
        let frame = parse_rtp_packet(&packet);
        assert_eq!(frame.sequence_number, -1);
        assert_eq!(frame.sequence(), u16::MAX);
        assert_eq!(frame.timestamp, -2);
        assert_eq!(frame.rtp_timestamp(), 0xFFFF_FFFE);
    }
}
