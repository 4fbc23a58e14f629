//! Server lifecycle and framing loop.
//!
//! [`Server::start`] binds the control endpoint, allocates the input and
//! reply buffers once, and spawns the framing loop on a dedicated worker
//! task. The worker serves exactly one peer at a time: it accumulates
//! length-prefixed frames, hands each complete frame to the dispatcher, and
//! writes the reply back. A misbehaving or vanished peer only ever costs a
//! re-accept; the worker stops for an unrecoverable accept failure or a
//! shutdown signal, nothing else.
//!
//! # Example
//!
//! ```ignore
//! use probewire::{Server, ServerConfig};
//!
//! let mut server = Server::start(ServerConfig::default(), my_target).await?;
//! // ... external tools connect and issue requests ...
//! server.stop().await?;
//! ```

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::dispatch::dispatch;
use crate::error::Result;
use crate::protocol::wire;
use crate::protocol::{LENGTH_PREFIX_SIZE, MAX_REPLY_SIZE, MAX_REQUEST_SIZE};
use crate::target::Target;
use crate::transport::{ControlListener, ControlStream, DEFAULT_SLOT};

/// Configuration for a control server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind slot: the TCP port on Windows, the socket-name suffix on Unix.
    pub slot: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { slot: DEFAULT_SLOT }
    }
}

/// A running control server.
///
/// Dropping a `Server` signals the worker to shut down without waiting for
/// it; call [`Server::stop`] for a synchronous, idempotent shutdown.
pub struct Server {
    shutdown: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
    endpoint: String,
}

impl Server {
    /// Bind the endpoint for `config.slot` and start serving `target`.
    ///
    /// Returns once the listener is live; requests are served on a spawned
    /// worker task that owns `target` until shutdown.
    pub async fn start<T>(config: ServerConfig, target: T) -> Result<Self>
    where
        T: Target + Send + 'static,
    {
        let listener = ControlListener::bind(config.slot).await?;
        let endpoint = listener.endpoint();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(serve_loop(listener, target, shutdown_rx));

        tracing::info!(%endpoint, "control server listening");

        Ok(Self {
            shutdown,
            worker: Some(worker),
            endpoint,
        })
    }

    /// Human-readable description of the bind point.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Signal shutdown and wait for the worker to exit.
    ///
    /// Idempotent: repeated calls after the first are no-ops. Unblocks a
    /// worker parked in accept or read, drops the listener (which removes
    /// the socket file on Unix), and surfaces a worker panic as an error.
    pub async fn stop(&mut self) -> Result<()> {
        let _ = self.shutdown.send(true);
        if let Some(worker) = self.worker.take() {
            worker.await?;
            tracing::info!("control server stopped");
        }
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Whether an accept failure should be retried instead of stopping the
/// worker. Connection-level conditions are the peer's fault, not ours.
fn accept_is_recoverable(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
    )
}

/// The framing loop, run on the worker task for the server's lifetime.
///
/// Both buffers live here, allocated once: requests are served strictly
/// sequentially, so a single exclusive borrow per request is all the
/// synchronization the buffers and the target ever need.
async fn serve_loop<T: Target>(
    listener: ControlListener,
    mut target: T,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut request = vec![0u8; MAX_REQUEST_SIZE];
    let mut reply = BytesMut::with_capacity(MAX_REPLY_SIZE);

    'accept: while !*shutdown.borrow() {
        // previous peer (if any) is dropped and closed here
        let mut peer = tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok(peer) => peer,
                Err(err) if accept_is_recoverable(&err) => {
                    tracing::warn!(error = %err, "recoverable accept failure, retrying");
                    continue;
                }
                Err(err) => {
                    tracing::error!(error = %err, "unrecoverable accept failure, stopping worker");
                    break;
                }
            },
        };
        tracing::debug!("peer connected");

        while !*shutdown.borrow() {
            let frame_len = tokio::select! {
                _ = shutdown.changed() => break 'accept,
                read = read_frame(&mut peer, &mut request) => match read {
                    Ok(Some(len)) => len,
                    Ok(None) => {
                        tracing::debug!("peer disconnected");
                        continue 'accept;
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "read failure, reconnecting");
                        continue 'accept;
                    }
                },
            };

            dispatch(
                &request[LENGTH_PREFIX_SIZE..frame_len],
                &mut reply,
                &mut target,
            );

            if let Err(err) = peer.write_all(&reply).await {
                tracing::debug!(error = %err, "write failure, reconnecting");
                continue 'accept;
            }
        }
    }
}

/// Accumulate one length-prefixed frame into `buf`.
///
/// Returns the declared total length once at least that many bytes are in,
/// or `Ok(None)` when the peer closed the stream. A declared length outside
/// `4..=MAX_REQUEST_SIZE` resets accumulation to zero and keeps reading on
/// the same connection; it never reaches the dispatcher. Bytes received
/// past the declared length are discarded with the frame they trail.
async fn read_frame(peer: &mut ControlStream, buf: &mut [u8]) -> std::io::Result<Option<usize>> {
    let mut received = 0;
    let mut total = LENGTH_PREFIX_SIZE;

    while received < total {
        let n = peer.read(&mut buf[received..]).await?;
        if n == 0 {
            return Ok(None);
        }
        received += n;

        if total == LENGTH_PREFIX_SIZE && received >= LENGTH_PREFIX_SIZE {
            let declared = wire::read_u32(buf, 0) as usize;
            if declared < LENGTH_PREFIX_SIZE || declared > buf.len() {
                tracing::warn!(declared, "rejecting frame with out-of-range length");
                received = 0;
                continue;
            }
            total = declared;
        }
    }

    Ok(Some(total))
}
