use std::io::{self, BufRead};

use super::Method;
use crate::error::{ParseErrorKind, Result, RtspError};

/// Status code treated as success. Every other code is a protocol failure.
pub const STATUS_OK: u16 = 200;

/// A parsed RTSP response (RFC 2326 §7).
///
/// Only the fields the client acts on are kept. A successful response is
/// read as exactly four lines:
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 2\r\n
/// Session: 123456\r\n
/// \r\n
/// ```
///
/// Any other status is read as the status line alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtspResponse {
    pub status_code: u16,
    /// Reason phrase following the status code (may be empty).
    pub reason: String,
    /// Echoed CSeq, when the echo line carried a number.
    pub cseq: Option<u32>,
    /// Session identifier with any `;timeout=` style parameters removed.
    /// Always present on a successful response.
    pub session_id: Option<String>,
}

impl RtspResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// Read one response from the control channel.
    ///
    /// `method` is the request this response answers; it is carried into
    /// parse errors for diagnosis. End of stream is a
    /// [`RtspError::Transport`] error.
    pub fn read_from<R: BufRead>(reader: &mut R, method: Method) -> Result<Self> {
        let status_line = read_line(reader)?;
        tracing::trace!(%method, line = %status_line, "status line");

        let (status_code, reason) =
            parse_status_line(&status_line).map_err(|kind| RtspError::Parse { method, kind })?;

        if status_code != STATUS_OK {
            return Ok(RtspResponse {
                status_code,
                reason,
                cseq: None,
                session_id: None,
            });
        }

        let cseq_line = read_line(reader)?;
        let cseq = parse_cseq_line(&cseq_line);
        if cseq.is_none() {
            tracing::warn!(%method, line = %cseq_line, "response CSeq echo not understood");
        }

        // Consume the whole response before judging the session line.
        let session_line = read_line(reader)?;
        let terminator = read_line(reader)?;
        if !terminator.is_empty() {
            tracing::warn!(%method, line = %terminator, "expected blank line after response headers");
        }

        let session_id = parse_session_line(&session_line)
            .map_err(|kind| RtspError::Parse { method, kind })?;

        Ok(RtspResponse {
            status_code,
            reason,
            cseq,
            session_id: Some(session_id),
        })
    }
}

/// Parse `RTSP/1.0 <code> <reason>`; the second whitespace token is the code.
pub fn parse_status_line(line: &str) -> std::result::Result<(u16, String), ParseErrorKind> {
    let mut tokens = line.split_whitespace();
    let _version = tokens.next().ok_or(ParseErrorKind::MissingStatusCode)?;
    let code = tokens.next().ok_or(ParseErrorKind::MissingStatusCode)?;
    let status = code
        .parse::<u16>()
        .map_err(|_| ParseErrorKind::InvalidStatusCode(code.to_string()))?;
    let reason = tokens.collect::<Vec<_>>().join(" ");
    Ok((status, reason))
}

/// Parse `Session: <id>[;param]`; the second whitespace token is the id.
pub fn parse_session_line(line: &str) -> std::result::Result<String, ParseErrorKind> {
    let token = line
        .split_whitespace()
        .nth(1)
        .ok_or(ParseErrorKind::MissingSessionId)?;
    let id = token.split(';').next().unwrap_or(token).trim();
    if id.is_empty() {
        return Err(ParseErrorKind::MissingSessionId);
    }
    Ok(id.to_string())
}

fn parse_cseq_line(line: &str) -> Option<u32> {
    line.split_whitespace().nth(1)?.parse().ok()
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "control connection closed by server",
        )
        .into());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
