use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use crate::error::{Result, RtspError};
use crate::protocol::{Method, RtspRequest, RtspResponse};

/// The RTSP control connection: one TCP stream carrying requests out and
/// responses back, one exchange at a time.
///
/// There is no read timeout. A server that never answers blocks the
/// exchange until the connection is shut down.
pub struct ControlChannel {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    peer_addr: SocketAddr,
}

impl ControlChannel {
    /// Resolve `host` and open the TCP connection.
    ///
    /// Every failure here (resolution, refusal, unreachable) is a
    /// [`RtspError::Connection`].
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let connection_error = |source| RtspError::Connection {
            addr: addr.clone(),
            source,
        };

        let stream = TcpStream::connect((host, port)).map_err(connection_error)?;
        let peer_addr = stream.peer_addr().map_err(connection_error)?;
        let reader_stream = stream.try_clone().map_err(connection_error)?;

        tracing::info!(%peer_addr, "control connection established");

        Ok(Self {
            reader: BufReader::new(reader_stream),
            writer: BufWriter::new(stream),
            peer_addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Write a request and flush it immediately.
    pub fn send(&mut self, request: &RtspRequest) -> Result<()> {
        tracing::debug!(
            peer = %self.peer_addr,
            method = %request.method,
            target = %request.target,
            cseq = request.cseq,
            "request"
        );
        self.writer.write_all(request.serialize().as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Block until one response has been read.
    pub fn read_response(&mut self, method: Method) -> Result<RtspResponse> {
        let response = RtspResponse::read_from(&mut self.reader, method)?;
        tracing::debug!(
            peer = %self.peer_addr,
            %method,
            status = response.status_code,
            "response"
        );
        Ok(response)
    }

    /// Shut down both directions of the TCP stream.
    pub fn shutdown(&self) -> std::io::Result<()> {
        self.writer.get_ref().shutdown(Shutdown::Both)
    }
}
