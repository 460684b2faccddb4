use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use rand::RngExt;

use crate::client::ClientConfig;
use crate::error::Result;

/// UDP socket the server streams RTP packets to.
///
/// Bound during SETUP on a locally unused port, which the client then
/// announces in the `Transport` header. Every receive is bounded by
/// [`ClientConfig::rtp_read_timeout`] so a receiver loop can observe
/// cancellation between packets.
///
/// The socket is shared with the receiver thread through an `Arc`; it is
/// closed once the channel and every receiver holding it are dropped.
#[derive(Debug)]
pub struct RtpChannel {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl RtpChannel {
    /// Bind on a random port from [`ClientConfig::rtp_port_range`].
    ///
    /// Ports already in use are skipped. After
    /// [`ClientConfig::rtp_port_attempts`] misses the OS picks an ephemeral
    /// port instead.
    pub fn bind(config: &ClientConfig) -> Result<Self> {
        let socket = Self::bind_random_port(config)?;
        socket.set_read_timeout(Some(config.rtp_read_timeout))?;
        let local_addr = socket.local_addr()?;

        tracing::debug!(port = local_addr.port(), "RTP socket bound");

        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
        })
    }

    fn bind_random_port(config: &ClientConfig) -> io::Result<UdpSocket> {
        let range = &config.rtp_port_range;
        let span = range.end.saturating_sub(range.start);

        if span > 0 {
            let mut rng = rand::rng();
            for _ in 0..config.rtp_port_attempts {
                let port = range.start + rng.random::<u16>() % span;
                match UdpSocket::bind((config.rtp_bind_ip, port)) {
                    Ok(socket) => return Ok(socket),
                    Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                        tracing::trace!(port, "RTP port in use");
                    }
                    Err(e) => return Err(e),
                }
            }
            tracing::debug!(
                attempts = config.rtp_port_attempts,
                "no free port in range, using an ephemeral port"
            );
        }

        UdpSocket::bind((config.rtp_bind_ip, 0))
    }

    /// Port announced to the server.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn socket(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn loopback_config() -> ClientConfig {
        ClientConfig {
            rtp_bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..ClientConfig::default()
        }
    }

    #[test]
    fn binds_inside_configured_range() {
        let config = loopback_config();
        let channel = RtpChannel::bind(&config).unwrap();
        assert!(config.rtp_port_range.contains(&channel.port()));
    }

    #[test]
    fn empty_range_falls_back_to_ephemeral_port() {
        let config = ClientConfig {
            rtp_port_range: 0..0,
            ..loopback_config()
        };
        let channel = RtpChannel::bind(&config).unwrap();
        assert_ne!(channel.port(), 0);
    }

    #[test]
    fn receive_is_bounded_by_timeout() {
        let config = ClientConfig {
            rtp_read_timeout: Duration::from_millis(50),
            ..loopback_config()
        };
        let channel = RtpChannel::bind(&config).unwrap();
        let mut buf = [0u8; 16];
        let err = channel.socket().recv(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ));
    }
}
