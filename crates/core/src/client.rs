use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{ParseErrorKind, Result, RtspError};
use crate::protocol::{CSeqCounter, Method, RtspRequest, RtspResponse};
use crate::session::{SessionListener, SessionState, TransportHeader};
use crate::transport::{ControlChannel, RtpChannel, RtpReceiver};

/// Client-side transport configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Local address the RTP socket binds to.
    pub rtp_bind_ip: IpAddr,
    /// Range random client RTP ports are drawn from.
    pub rtp_port_range: Range<u16>,
    /// Random ports tried before letting the OS pick one.
    pub rtp_port_attempts: usize,
    /// Upper bound on a single RTP receive. Must be non-zero.
    pub rtp_read_timeout: Duration,
    /// Receive buffer size; larger datagrams are truncated.
    pub rtp_buffer_len: usize,
    /// Profile token written in the SETUP `Transport` header.
    pub transport_profile: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rtp_bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            rtp_port_range: 6666..16666,
            rtp_port_attempts: 16,
            rtp_read_timeout: Duration::from_secs(1),
            rtp_buffer_len: 0x10000,
            transport_profile: "RTP/UDP".to_string(),
        }
    }
}

/// A connection with an RTSP server, driving one stream through
/// SETUP → PLAY → PAUSE/TEARDOWN.
///
/// Every public operation takes the same lock, so operations on one
/// connection never interleave; the type can be shared across threads
/// (e.g. behind an `Arc`). An operation that fails leaves the state
/// unchanged and may be retried.
///
/// Operations invoked from a state the transition table does not allow
/// fail with [`RtspError::State`] before anything is written to the
/// server.
pub struct Connection {
    inner: Mutex<Inner>,
    listener: Arc<dyn SessionListener>,
    config: ClientConfig,
    peer_addr: SocketAddr,
}

/// Mutable connection state. Only touched with the lock held.
struct Inner {
    control: Option<ControlChannel>,
    cseq: CSeqCounter,
    session_id: Option<String>,
    stream_name: Option<String>,
    state: SessionState,
    rtp: Option<RtpChannel>,
    receiver: Option<RtpReceiver>,
}

impl Connection {
    /// Open the control connection. No request is sent yet.
    pub fn connect(listener: Arc<dyn SessionListener>, host: &str, port: u16) -> Result<Self> {
        Self::connect_with_config(listener, host, port, ClientConfig::default())
    }

    /// Open the control connection with custom transport configuration.
    pub fn connect_with_config(
        listener: Arc<dyn SessionListener>,
        host: &str,
        port: u16,
        config: ClientConfig,
    ) -> Result<Self> {
        let control = ControlChannel::connect(host, port)?;
        let peer_addr = control.peer_addr();

        tracing::info!(%peer_addr, state = %SessionState::Init, "new RTSP state");

        Ok(Self {
            inner: Mutex::new(Inner {
                control: Some(control),
                cseq: CSeqCounter::new(),
                session_id: None,
                stream_name: None,
                state: SessionState::Init,
                rtp: None,
                receiver: None,
            }),
            listener,
            config,
            peer_addr,
        })
    }

    /// Send SETUP for `stream_name`.
    ///
    /// Binds the RTP socket first and announces its port. The session id
    /// from the first successful SETUP is kept for the life of the
    /// connection.
    pub fn setup(&self, stream_name: &str) -> Result<()> {
        let result = {
            let mut inner = self.inner.lock();
            inner.require(Method::Setup, &[SessionState::Init])?;
            self.setup_locked(&mut inner, stream_name)
        };
        result.inspect_err(|e| self.report_failure(e))
    }

    fn setup_locked(&self, inner: &mut Inner, stream_name: &str) -> Result<()> {
        let channel = RtpChannel::bind(&self.config)?;
        let transport = TransportHeader::new(&self.config.transport_profile, channel.port());

        let response = inner.exchange(Method::Setup, stream_name, Some(&transport))?;
        let Some(id) = response.session_id else {
            return Err(RtspError::Parse {
                method: Method::Setup,
                kind: ParseErrorKind::MissingSessionId,
            });
        };

        if inner.session_id.is_none() {
            tracing::info!(session_id = %id, "session established");
            inner.session_id = Some(id);
        } else if inner.session_id.as_deref() != Some(id.as_str()) {
            tracing::warn!(
                session_id = ?inner.session_id,
                announced = %id,
                "server announced a different session id, keeping the first"
            );
        }

        tracing::debug!(port = channel.port(), stream = stream_name, "stream set up");
        inner.rtp = Some(channel);
        inner.stream_name = Some(stream_name.to_string());
        inner.transition(SessionState::Ready);
        Ok(())
    }

    /// Send PLAY and start receiving frames.
    pub fn play(&self) -> Result<()> {
        let requested = self.listener.current_stream_name();
        let result = {
            let mut inner = self.inner.lock();
            inner.require(Method::Play, &[SessionState::Ready])?;
            self.play_locked(&mut inner, requested)
        };
        result.inspect_err(|e| self.report_failure(e))
    }

    fn play_locked(&self, inner: &mut Inner, requested: Option<String>) -> Result<()> {
        let target = inner.target(requested);
        inner.exchange(Method::Play, &target, None)?;

        let Some(channel) = inner.rtp.as_ref() else {
            return Err(inner.state_error(Method::Play, &[SessionState::Ready]));
        };
        let started =
            RtpReceiver::start(channel, self.listener.clone(), self.config.rtp_buffer_len);
        let receiver = match started {
            Ok(receiver) => receiver,
            Err(e) => {
                inner.rollback_play(&target);
                return Err(e);
            }
        };

        inner.receiver = Some(receiver);
        inner.transition(SessionState::Playing);
        Ok(())
    }

    /// Send PAUSE and stop receiving frames.
    ///
    /// Returns only after the receiver thread has exited.
    pub fn pause(&self) -> Result<()> {
        let requested = self.listener.current_stream_name();
        let stopped = {
            let mut inner = self.inner.lock();
            inner.require(Method::Pause, &[SessionState::Playing])?;
            Self::pause_locked(&mut inner, requested)
        }
        .inspect_err(|e| self.report_failure(e))?;

        if let Some(receiver) = stopped {
            receiver.stop();
        }
        Ok(())
    }

    fn pause_locked(inner: &mut Inner, requested: Option<String>) -> Result<Option<RtpReceiver>> {
        let target = inner.target(requested);
        inner.exchange(Method::Pause, &target, None)?;

        let stopped = inner.take_receiver();
        inner.transition(SessionState::Ready);
        Ok(stopped)
    }

    /// Send TEARDOWN, stop receiving and close the RTP socket.
    ///
    /// The control connection stays open and a new SETUP is accepted.
    pub fn teardown(&self) -> Result<()> {
        let requested = self.listener.current_stream_name();
        let stopped = {
            let mut inner = self.inner.lock();
            inner.require(
                Method::Teardown,
                &[SessionState::Ready, SessionState::Playing],
            )?;
            Self::teardown_locked(&mut inner, requested)
        }
        .inspect_err(|e| self.report_failure(e))?;

        if let Some(receiver) = stopped {
            receiver.stop();
        }
        Ok(())
    }

    fn teardown_locked(
        inner: &mut Inner,
        requested: Option<String>,
    ) -> Result<Option<RtpReceiver>> {
        let target = inner.target(requested);
        inner.exchange(Method::Teardown, &target, None)?;

        let stopped = inner.take_receiver();
        if let Some(channel) = inner.rtp.take() {
            tracing::debug!(port = channel.port(), "RTP socket closed");
        }
        inner.transition(SessionState::Init);
        Ok(stopped)
    }

    /// Close the control connection and release every resource.
    ///
    /// Valid from any state and idempotent. Failures while closing are
    /// logged, never returned.
    pub fn close(&self) {
        let stopped = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Closed {
                return;
            }

            let stopped = inner.take_receiver();
            inner.rtp = None;

            if let Some(control) = inner.control.take()
                && let Err(e) = control.shutdown()
            {
                tracing::warn!(peer = %self.peer_addr, error = %e, "error closing control connection");
            }

            inner.transition(SessionState::Closed);
            stopped
        };

        if let Some(receiver) = stopped {
            receiver.stop();
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Session id issued by the server on the first successful SETUP.
    pub fn session_id(&self) -> Option<String> {
        self.inner.lock().session_id.clone()
    }

    /// CSeq of the most recent request, `0` before any request.
    pub fn last_cseq(&self) -> u32 {
        self.inner.lock().cseq.last()
    }

    /// Local RTP port, while a stream is set up.
    pub fn rtp_port(&self) -> Option<u16> {
        self.inner.lock().rtp.as_ref().map(RtpChannel::port)
    }

    /// Whether the RTP receiver thread is running.
    pub fn is_receiving(&self) -> bool {
        self.inner
            .lock()
            .receiver
            .as_ref()
            .is_some_and(RtpReceiver::is_running)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Runs with the lock released, so the listener may query the
    /// connection from `report_error`.
    fn report_failure(&self, e: &RtspError) {
        tracing::warn!(peer = %self.peer_addr, error = %e, "RTSP operation failed");
        self.listener.report_error(e.kind(), &e.to_string());
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl Inner {
    fn require(&self, method: Method, valid_from: &'static [SessionState]) -> Result<()> {
        if valid_from.contains(&self.state) {
            Ok(())
        } else {
            Err(self.state_error(method, valid_from))
        }
    }

    fn state_error(&self, method: Method, valid_from: &'static [SessionState]) -> RtspError {
        tracing::debug!(%method, state = %self.state, "operation rejected");
        RtspError::State {
            method,
            state: self.state,
            valid_from,
        }
    }

    /// One request/response exchange. Consumes a CSeq even on failure.
    fn exchange(
        &mut self,
        method: Method,
        target: &str,
        transport: Option<&TransportHeader>,
    ) -> Result<RtspResponse> {
        let Some(control) = self.control.as_mut() else {
            return Err(RtspError::State {
                method,
                state: SessionState::Closed,
                valid_from: &[],
            });
        };

        let cseq = self.cseq.next();
        let mut request = RtspRequest::new(method, target, cseq);
        if let Some(transport) = transport {
            request = request.add_header("Transport", &transport.value());
        }
        if let Some(id) = &self.session_id {
            request = request.add_header("Session", id);
        }

        control.send(&request)?;
        let response = control.read_response(method)?;

        if !response.is_success() {
            return Err(RtspError::Status {
                method,
                status: response.status_code,
                reason: response.reason,
            });
        }

        if let Some(echoed) = response.cseq
            && echoed != cseq
        {
            tracing::warn!(%method, cseq, echoed, "response CSeq does not match request");
        }

        Ok(response)
    }

    /// Request name from the listener, else the name given to SETUP.
    fn target(&self, requested: Option<String>) -> String {
        requested
            .or_else(|| self.stream_name.clone())
            .unwrap_or_default()
    }

    /// Detach the receiver and signal it to stop. The caller joins it
    /// after releasing the lock.
    fn take_receiver(&mut self) -> Option<RtpReceiver> {
        let receiver = self.receiver.take();
        if let Some(receiver) = &receiver {
            receiver.signal_stop();
        }
        receiver
    }

    /// The server accepted PLAY but no receiver could be started: ask it
    /// to pause so both sides agree on READY.
    fn rollback_play(&mut self, target: &str) {
        tracing::error!(
            state = %self.state,
            "server is playing but the RTP receiver did not start, sending PAUSE"
        );
        match self.exchange(Method::Pause, target, None) {
            Ok(_) => tracing::info!("server stream paused after failed PLAY"),
            Err(e) => tracing::warn!(error = %e, "PAUSE after failed PLAY was not accepted"),
        }
    }

    fn transition(&mut self, state: SessionState) {
        tracing::info!(old_state = %self.state, new_state = %state, "new RTSP state");
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::media::Frame;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    struct Quiet;

    impl SessionListener for Quiet {
        fn deliver_frame(&self, _frame: Frame) {}
        fn report_error(&self, _kind: ErrorKind, _message: &str) {}
    }

    /// Answers every request with a 200 and forwards its request line.
    fn answering_server() -> (u16, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut cseq = 0;
            loop {
                let mut request = String::new();
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => return,
                        Ok(_) if line.trim().is_empty() => break,
                        Ok(_) => request.push_str(&line),
                    }
                }
                cseq += 1;
                let _ = tx.send(request);
                let reply = format!("RTSP/1.0 200 OK\r\nCSeq: {cseq}\r\nSession: 42\r\n\r\n");
                if writer.write_all(reply.as_bytes()).is_err() {
                    return;
                }
            }
        });
        (port, rx)
    }

    #[test]
    fn failed_receiver_start_pauses_the_server() {
        let (port, requests) = answering_server();
        let config = ClientConfig {
            rtp_bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..ClientConfig::default()
        };
        let conn = Connection::connect_with_config(Arc::new(Quiet), "127.0.0.1", port, config)
            .unwrap();
        conn.setup("clip").unwrap();

        conn.inner.lock().rollback_play("clip");

        let timeout = Duration::from_secs(2);
        assert!(requests.recv_timeout(timeout).unwrap().starts_with("SETUP clip"));
        let pause = requests.recv_timeout(timeout).unwrap();
        assert!(pause.starts_with("PAUSE clip RTSP/1.0\r\n"), "got {pause}");
        assert!(pause.contains("CSeq: 2\r\n"));
        assert!(pause.contains("Session: 42\r\n"));
        assert_eq!(conn.state(), SessionState::Ready);
        assert!(!conn.is_receiving());
    }
}
