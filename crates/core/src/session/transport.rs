/// Client transport parameters announced in the SETUP `Transport` header
/// (RFC 2326 §12.39).
///
/// The client binds its RTP socket first, then tells the server where to
/// send:
///
/// ```text
/// Client → Server:
///   Transport: RTP/UDP; client_port= 7000
/// ```
///
/// Only a single RTP port is announced; no RTCP port is reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHeader {
    /// Profile token, e.g. `RTP/UDP` or `RTP/AVP`.
    pub profile: String,
    /// Client's RTP receive port.
    pub client_rtp_port: u16,
}

impl TransportHeader {
    pub fn new(profile: &str, client_rtp_port: u16) -> Self {
        Self {
            profile: profile.to_string(),
            client_rtp_port,
        }
    }

    /// Header value as written on the wire.
    pub fn value(&self) -> String {
        format!("{}; client_port= {}", self.profile, self.client_rtp_port)
    }

    /// Parse a `Transport` header value the way a server reads it.
    ///
    /// Accepts both the spaced form this client writes and the compact
    /// `client_port=RTP-RTCP` form; only the RTP port is kept.
    #[cfg(test)]
    pub(crate) fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';').map(str::trim);
        let profile = parts.next().filter(|p| !p.is_empty())?;

        for part in parts {
            if let Some(ports) = part.strip_prefix("client_port=") {
                let rtp = ports.trim().split('-').next()?;
                let client_rtp_port: u16 = rtp.trim().parse().ok()?;
                return Some(Self::new(profile, client_rtp_port));
            }
        }
        None
    }
}
