//! TCP transport from the controller to the target.
//!
//! One connection per process, opened at startup.  Events are written
//! synchronously from the hook callback thread, one encoded object per
//! write, with no framing around them.  There is no send queue, no retry and
//! no reconnect: when a write fails the connection is closed and every
//! later event is dropped until the process is restarted.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Mutex, MutexGuard, PoisonError};

use keybridge_core::{encode_event, KeyEvent};
use thiserror::Error;
use tokio::net::TcpSocket;
use tracing::{debug, error, info};

use crate::application::capture_service::{EventTransmitter, TransportError};

/// Error type for establishing the connection.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{host} did not resolve to any address")]
    NoAddress { host: String },
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// [`EventTransmitter`] writing to a blocking TCP stream.
pub struct TcpTransmitter {
    stream: Mutex<Option<TcpStream>>,
    peer: SocketAddr,
}

impl TcpTransmitter {
    /// Resolves `host` and connects to the first address that accepts.
    ///
    /// The socket is created through tokio so keep-alive can be set before
    /// connecting, then handed over as a blocking std stream.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the host cannot be resolved or no
    /// resolved address accepts the connection.
    pub async fn connect(host: &str, port: u16, keepalive: bool) -> Result<Self, NetworkError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| NetworkError::Resolve {
                host: host.to_string(),
                source,
            })?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            match connect_one(addr, keepalive).await {
                Ok(stream) => {
                    info!(%addr, keepalive, "connected to target");
                    return Ok(Self::from_stream(stream, addr));
                }
                Err(source) => {
                    debug!(%addr, "connect failed: {source}");
                    last_error = Some(NetworkError::ConnectFailed { addr, source });
                }
            }
        }
        Err(last_error.unwrap_or_else(|| NetworkError::NoAddress {
            host: host.to_string(),
        }))
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
            peer,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn lock(&self) -> MutexGuard<'_, Option<TcpStream>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn connect_one(addr: SocketAddr, keepalive: bool) -> std::io::Result<TcpStream> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_keepalive(keepalive)?;
    let stream = socket.connect(addr).await?;
    stream.set_nodelay(true)?;
    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;
    Ok(stream)
}

impl EventTransmitter for TcpTransmitter {
    fn send(&self, event: &KeyEvent) -> Result<(), TransportError> {
        let mut guard = self.lock();
        let Some(stream) = guard.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        let bytes = encode_event(event)?;
        if let Err(e) = stream.write_all(&bytes) {
            error!(peer = %self.peer, "send failed, closing connection: {e}");
            if let Some(stream) = guard.take() {
                let _ = stream.shutdown(Shutdown::Both);
            }
            return Err(TransportError::Io(e));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    fn close(&self) {
        if let Some(stream) = self.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!(peer = %self.peer, "connection closed");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use keybridge_core::KeyIdentifier;
    use std::io::Read;
    use std::net::TcpListener;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_and_send_writes_bare_objects() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let tx = TcpTransmitter::connect("127.0.0.1", port, true)
            .await
            .expect("connect");
        let (mut peer, _) = listener.accept().unwrap();

        // Act
        tx.send(&KeyEvent::press(KeyIdentifier::Char("a".into()))).unwrap();
        tx.send(&KeyEvent::release(KeyIdentifier::VirtualCode(255))).unwrap();
        tx.close();

        // Assert
        let mut received = String::new();
        peer.read_to_string(&mut received).unwrap();
        assert_eq!(
            received,
            r#"{"type":"press","key_type":"char","value":"a"}{"type":"release","key_type":"vk","value":255}"#
        );
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpTransmitter::connect("127.0.0.1", port, true).await;

        assert!(matches!(result, Err(NetworkError::ConnectFailed { .. })));
    }

    #[tokio::test]
    async fn test_send_after_close_is_not_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let tx = TcpTransmitter::connect("127.0.0.1", port, false).await.unwrap();

        tx.close();
        tx.close();
        let result = tx.send(&KeyEvent::press(KeyIdentifier::Char("a".into())));

        assert!(!tx.is_connected());
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_write_failure_clears_connection() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let tx = TcpTransmitter::connect("127.0.0.1", port, true).await.unwrap();
        let (peer, _) = listener.accept().unwrap();
        drop(peer);
        let event = KeyEvent::press(KeyIdentifier::Name("enter".into()));

        // Act: the first writes after the peer closes may still be buffered,
        // so keep writing until the reset is reported.
        let mut failure = None;
        for _ in 0..100 {
            if let Err(e) = tx.send(&event) {
                failure = Some(e);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        // Assert
        assert!(matches!(failure, Some(TransportError::Io(_))));
        assert!(!tx.is_connected());
        assert!(matches!(tx.send(&event), Err(TransportError::NotConnected)));
    }
}
