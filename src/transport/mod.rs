//! Transport module - platform-specific control endpoint.
//!
//! Provides abstraction over:
//! - Unix Domain Sockets (Linux/macOS)
//! - Loopback TCP (Windows)
//!
//! The framing loop depends only on [`ControlListener`]/[`ControlStream`];
//! which transport backs them is decided by `cfg`, not at runtime.

mod socket;

pub use socket::{ControlListener, ControlStream, DEFAULT_SLOT, SOCKET_BASE_NAME};

#[cfg(unix)]
pub use socket::socket_path;
