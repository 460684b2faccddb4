use super::{Method, RTSP_VERSION};

/// An outgoing RTSP request (RFC 2326 §6).
///
/// Serializes to the client wire format:
///
/// ```text
/// Method SP target SP RTSP/1.0 CRLF
/// CSeq: N CRLF
/// *(Header: Value CRLF)
/// CRLF
/// ```
///
/// Uses a builder pattern: chain [`add_header`](Self::add_header), then
/// call [`serialize`](Self::serialize). Headers are written in insertion
/// order after `CSeq`.
#[must_use]
#[derive(Debug, Clone)]
pub struct RtspRequest {
    pub method: Method,
    /// Stream identifier the request applies to (e.g. `movie.Mjpeg`).
    pub target: String,
    pub cseq: u32,
    pub headers: Vec<(String, String)>,
}

impl RtspRequest {
    pub fn new(method: Method, target: &str, cseq: u32) -> Self {
        RtspRequest {
            method,
            target: target.to_string(),
            cseq,
            headers: Vec::new(),
        }
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Look up a header value by name (case-insensitive, per RFC 2326 §4.2).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serialize to the RTSP text wire format, including the blank-line
    /// terminator.
    pub fn serialize(&self) -> String {
        let mut request = format!(
            "{} {} {}\r\n",
            self.method.as_str(),
            self.target,
            RTSP_VERSION
        );
        request.push_str(&format!("CSeq: {}\r\n", self.cseq));

        for (name, value) in &self.headers {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }

        request.push_str("\r\n");
        request
    }
}

/// Monotonic CSeq source (RFC 2326 §12.17).
///
/// Numbers start at 1 and advance by exactly one per request for the life
/// of a connection; nothing resets it.
#[derive(Debug, Default)]
pub struct CSeqCounter {
    last: u32,
}

impl CSeqCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the number for the next request.
    pub fn next(&mut self) -> u32 {
        self.last = self.last.wrapping_add(1);
        self.last
    }

    /// Number carried by the most recent request, `0` before the first.
    pub fn last(&self) -> u32 {
        self.last
    }
}
