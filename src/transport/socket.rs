//! Platform-specific control socket implementation.
//!
//! - Unix: Unix Domain Socket at a runtime-directory path
//! - Windows: TCP socket bound to loopback only
//!
//! The slot selects the bind point so multiple instances can coexist: it is
//! the TCP port on Windows and a socket-filename suffix on Unix (no suffix
//! for the default slot, matching what client tools probe for first).

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{ProbewireError, Result};

/// Slot used when the embedder does not pick one.
pub const DEFAULT_SLOT: u16 = 28011;

/// Base name of the Unix socket file.
pub const SOCKET_BASE_NAME: &str = "probewire.sock";

/// Compute the Unix socket path for a slot.
///
/// The directory is `$XDG_RUNTIME_DIR` (`$TMPDIR` on macOS), falling back to
/// `/tmp` when unset. Non-default slots get a `.{slot}` suffix.
#[cfg(unix)]
pub fn socket_path(slot: u16) -> std::path::PathBuf {
    #[cfg(target_os = "macos")]
    let runtime_var = "TMPDIR";
    #[cfg(not(target_os = "macos"))]
    let runtime_var = "XDG_RUNTIME_DIR";

    let dir = std::env::var_os(runtime_var)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp"));

    let mut name = String::from(SOCKET_BASE_NAME);
    if slot != DEFAULT_SLOT {
        name.push('.');
        name.push_str(&slot.to_string());
    }
    dir.join(name)
}

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::path::PathBuf;
    use tokio::net::{UnixListener, UnixStream};

    /// Unix Domain Socket listener.
    pub struct ControlListener {
        listener: UnixListener,
        path: PathBuf,
    }

    /// Accepted peer connection.
    pub struct ControlStream {
        stream: UnixStream,
    }

    impl ControlListener {
        /// Bind the control socket for `slot`.
        ///
        /// Unlinks any stale socket file first, so a crashed previous
        /// instance does not block the bind.
        pub async fn bind(slot: u16) -> Result<Self> {
            let path = socket_path(slot);
            if path.exists() {
                let _ = std::fs::remove_file(&path);
            }

            let listener = UnixListener::bind(&path).map_err(|source| ProbewireError::Bind {
                endpoint: path.display().to_string(),
                source,
            })?;

            Ok(Self { listener, path })
        }

        /// Accept the next peer connection.
        pub async fn accept(&self) -> std::io::Result<ControlStream> {
            let (stream, _addr) = self.listener.accept().await?;
            Ok(ControlStream { stream })
        }

        /// Human-readable description of the bind point.
        pub fn endpoint(&self) -> String {
            self.path.display().to_string()
        }
    }

    impl Drop for ControlListener {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    impl AsyncRead for ControlStream {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for ControlStream {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::pin::Pin::new(&mut self.stream).poll_write(cx, buf)
        }

        fn poll_flush(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_flush(cx)
        }

        fn poll_shutdown(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_shutdown(cx)
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::{TcpListener, TcpStream};

    /// Loopback TCP listener; the slot is the port.
    pub struct ControlListener {
        listener: TcpListener,
        port: u16,
    }

    /// Accepted peer connection.
    pub struct ControlStream {
        stream: TcpStream,
    }

    impl ControlListener {
        /// Bind the control socket for `slot` on 127.0.0.1 only.
        pub async fn bind(slot: u16) -> Result<Self> {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, slot))
                .await
                .map_err(|source| ProbewireError::Bind {
                    endpoint: format!("127.0.0.1:{slot}"),
                    source,
                })?;

            Ok(Self {
                listener,
                port: slot,
            })
        }

        /// Accept the next peer connection.
        pub async fn accept(&self) -> std::io::Result<ControlStream> {
            let (stream, _addr) = self.listener.accept().await?;
            Ok(ControlStream { stream })
        }

        /// Human-readable description of the bind point.
        pub fn endpoint(&self) -> String {
            format!("127.0.0.1:{}", self.port)
        }
    }

    impl AsyncRead for ControlStream {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for ControlStream {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::pin::Pin::new(&mut self.stream).poll_write(cx, buf)
        }

        fn poll_flush(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_flush(cx)
        }

        fn poll_shutdown(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.stream).poll_shutdown(cx)
        }
    }
}

// ============================================================================
// Platform-independent re-exports
// ============================================================================

#[cfg(unix)]
pub use unix_impl::{ControlListener, ControlStream};

#[cfg(windows)]
pub use windows_impl::{ControlListener, ControlStream};
