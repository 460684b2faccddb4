use std::io;
use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{ErrorKind, Result};
use crate::media::parse_rtp_packet;
use crate::session::SessionListener;
use crate::transport::RtpChannel;

/// Pause after a hard socket error before receiving again.
const ERROR_BACKOFF: Duration = Duration::from_millis(20);

/// Background thread feeding decoded RTP frames to a [`SessionListener`].
///
/// The loop checks the `running` flag between receives; every receive is
/// bounded by the channel's read timeout, so [`stop`](Self::stop) returns
/// within one timeout period. Dropping the receiver also stops it.
pub struct RtpReceiver {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RtpReceiver {
    /// Spawn the receive loop on `channel`.
    pub fn start(
        channel: &RtpChannel,
        listener: Arc<dyn SessionListener>,
        buffer_len: usize,
    ) -> Result<Self> {
        Self::spawn(channel.socket(), listener, buffer_len)
    }

    /// Spawn the receive loop on a bound socket. The socket must carry a
    /// read timeout for [`stop`](Self::stop) to return.
    pub(crate) fn spawn(
        socket: Arc<UdpSocket>,
        listener: Arc<dyn SessionListener>,
        buffer_len: usize,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        let local_addr = socket.local_addr()?;

        let handle = thread::Builder::new()
            .name("rtp-receiver".to_string())
            .spawn(move || receive_loop(socket, listener, r, buffer_len))?;

        tracing::debug!(%local_addr, "RTP receiver started");

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the loop and wait for the thread to exit.
    ///
    /// When this returns no further frame will be delivered and the
    /// thread's handle on the socket has been released.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Ask the loop to exit without waiting for it.
    pub(crate) fn signal_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn shutdown(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            // Stopped from a listener callback on the receiver thread itself.
            if handle.thread().id() == thread::current().id() {
                tracing::debug!("RTP receiver stopping itself");
                return;
            }
            if handle.join().is_err() {
                tracing::error!("RTP receiver thread panicked");
            } else {
                tracing::debug!("RTP receiver stopped");
            }
        }
    }
}

impl Drop for RtpReceiver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn receive_loop(
    socket: Arc<UdpSocket>,
    listener: Arc<dyn SessionListener>,
    running: Arc<AtomicBool>,
    buffer_len: usize,
) {
    let mut buffer = vec![0u8; buffer_len];

    while running.load(Ordering::SeqCst) {
        match socket.recv(&mut buffer) {
            Ok(len) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let frame = parse_rtp_packet(&buffer[..len]);
                tracing::trace!(
                    len,
                    pt = frame.payload_type,
                    seq = frame.sequence_number,
                    ts = frame.timestamp,
                    "RTP packet"
                );
                listener.deliver_frame(frame);
            }
            Err(ref e)
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                tracing::warn!(error = %e, "RTP receive error");
                listener.report_error(ErrorKind::Transport, &format!("RTP receive failed: {e}"));
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    tracing::debug!("RTP receive loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::media::Frame;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Frame>>, Mutex<Vec<ErrorKind>>);

    impl SessionListener for Collect {
        fn deliver_frame(&self, frame: Frame) {
            self.0.lock().unwrap().push(frame);
        }

        fn report_error(&self, kind: ErrorKind, _message: &str) {
            self.1.lock().unwrap().push(kind);
        }
    }

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !cond() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn delivers_until_stopped() {
        let config = ClientConfig {
            rtp_bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            rtp_read_timeout: Duration::from_millis(100),
            ..ClientConfig::default()
        };
        let channel = RtpChannel::bind(&config).unwrap();
        let listener = Arc::new(Collect::default());
        let receiver = RtpReceiver::start(&channel, listener.clone(), 2048).unwrap();
        assert!(receiver.is_running());

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let packet = [0x80, 0x1A, 0, 7, 0, 0, 0, 9, 0, 0, 0, 0, 0xFF];
        sender.send_to(&packet, channel.local_addr()).unwrap();

        assert!(wait_until(|| !listener.0.lock().unwrap().is_empty()));

        let started = Instant::now();
        receiver.stop();
        assert!(started.elapsed() < Duration::from_secs(1));

        sender.send_to(&packet, channel.local_addr()).unwrap();
        thread::sleep(Duration::from_millis(150));

        let frames = listener.0.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload_type, 26);
        assert_eq!(frames[0].sequence_number, 7);
        assert_eq!(frames[0].payload, vec![0xFF]);
    }

    // A connected UDP socket surfaces ICMP port-unreachable as
    // ECONNREFUSED on the next receive.
    #[cfg(target_os = "linux")]
    #[test]
    fn socket_error_is_reported_and_loop_keeps_receiving() {
        let peer_port = {
            let closed = UdpSocket::bind("127.0.0.1:0").unwrap();
            closed.local_addr().unwrap().port()
        };
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        socket.connect(("127.0.0.1", peer_port)).unwrap();
        socket.send(b"ping").unwrap();
        let local = socket.local_addr().unwrap();

        let listener = Arc::new(Collect::default());
        let receiver = RtpReceiver::spawn(Arc::new(socket), listener.clone(), 2048).unwrap();

        assert!(
            wait_until(|| !listener.1.lock().unwrap().is_empty()),
            "receive error was not reported"
        );
        assert_eq!(listener.1.lock().unwrap()[0], ErrorKind::Transport);
        assert!(receiver.is_running());

        let peer = UdpSocket::bind(("127.0.0.1", peer_port)).unwrap();
        let packet = [0x80, 0x60, 0, 3, 0, 0, 0, 5, 0, 0, 0, 0, 0x01];
        peer.send_to(&packet, local).unwrap();

        assert!(
            wait_until(|| !listener.0.lock().unwrap().is_empty()),
            "no frame after the error"
        );
        receiver.stop();
        assert_eq!(listener.0.lock().unwrap()[0].sequence_number, 3);
    }
}
