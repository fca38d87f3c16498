//! TCP listener and session loop for the target.
//!
//! The target serves exactly one controller per process:
//!
//! ```text
//! bind 0.0.0.0:65432 ─► accept one connection ─► read 4096-byte chunks
//!     ─► StreamReassembler ─► InjectKeysUseCase ─► ... until EOF or error
//! ```
//!
//! There is no read timeout and no second accept.  When the controller goes
//! away the session ends, the use case (and with it the virtual keyboard)
//! is dropped, and the process exits.

use std::net::SocketAddr;

use keybridge_core::StreamReassembler;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::inject_keys::{InjectKeysUseCase, Injection};

/// Size of each socket read.
pub const RECV_CHUNK_SIZE: usize = 4096;

/// Error type for the target's network setup.
#[derive(Debug, Error)]
pub enum TargetNetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The controller closed the connection.
    PeerClosed,
    /// Reading from the connection failed.
    ReadError(std::io::Error),
}

/// Counters reported when a session ends.
#[derive(Debug)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub end: SessionEnd,
    /// Frames that decoded into a key event.
    pub events: u64,
    /// Events written to the device.
    pub injected: u64,
    /// Frames that failed to decode.
    pub rejected_frames: u64,
}

/// Binds the listening socket.
///
/// # Errors
///
/// Returns [`TargetNetworkError::BindFailed`] if the address is in use or
/// not available.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, TargetNetworkError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TargetNetworkError::BindFailed { addr, source })?;
    info!(%addr, "waiting for the controller");
    Ok(listener)
}

/// Accepts one connection and runs the session to completion.
///
/// The listener is closed as soon as the connection is accepted.  The use
/// case is owned by the returned future, so the virtual keyboard is
/// released when the session ends or when the future is dropped.
///
/// # Errors
///
/// Returns [`TargetNetworkError::AcceptFailed`] if no connection could be
/// accepted.
pub async fn serve_single_session(
    listener: TcpListener,
    use_case: InjectKeysUseCase,
) -> Result<SessionReport, TargetNetworkError> {
    let (stream, peer) = listener
        .accept()
        .await
        .map_err(TargetNetworkError::AcceptFailed)?;
    drop(listener);

    let session_id = Uuid::new_v4();
    info!(%session_id, %peer, "controller connected");
    Ok(run_session(stream, use_case, session_id).await)
}

/// Reads from `reader` until EOF or a read error, injecting every complete
/// frame in arrival order.
pub async fn run_session<R>(
    mut reader: R,
    mut use_case: InjectKeysUseCase,
    session_id: Uuid,
) -> SessionReport
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; RECV_CHUNK_SIZE];
    let mut reassembler = StreamReassembler::new();
    let mut report = SessionReport {
        session_id,
        end: SessionEnd::PeerClosed,
        events: 0,
        injected: 0,
        rejected_frames: 0,
    };

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                info!(%session_id, "controller disconnected");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                error!(%session_id, "read failed: {e}");
                report.end = SessionEnd::ReadError(e);
                break;
            }
        };
        reassembler.extend(&buf[..n]);

        while let Some(decoded) = reassembler.next_event() {
            match decoded {
                Ok(event) => {
                    report.events += 1;
                    if let Injection::Injected { .. } = use_case.handle_event(&event) {
                        report.injected += 1;
                    }
                }
                Err(e) => {
                    report.rejected_frames += 1;
                    warn!(%session_id, "discarding frame: {e}");
                }
            }
        }
        if reassembler.buffered() > 0 {
            debug!(%session_id, pending = reassembler.buffered(), "partial frame buffered");
        }
    }

    info!(
        %session_id,
        events = report.events,
        injected = report.injected,
        rejected = report.rejected_frames,
        "session ended"
    );
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────
