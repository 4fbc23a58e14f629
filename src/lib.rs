//! # probewire
//!
//! Local control socket for inspecting and mutating a live target process.
//!
//! An external tool connects to the endpoint and issues a compact binary
//! protocol: length-prefixed frames carrying a sequence of commands (memory
//! reads/writes, save/load state, identity and status queries). The crate
//! owns the protocol and session layer only; the controlled process itself
//! is reached through the [`Target`] trait implemented by the embedder.
//!
//! ## Architecture
//!
//! - **Transport**: Unix Domain Socket (POSIX) or loopback TCP (Windows),
//!   selected by platform. One accepted peer at a time.
//! - **Framing**: each request is `[u32 total_length][commands...]`, each
//!   reply `[u32 total_length][status][payloads...]`, all little-endian.
//! - **Dispatch**: commands execute strictly sequentially on one worker
//!   task against pre-allocated request/reply buffers; the first invalid
//!   command fails its whole frame.
//! - **Resilience**: a disconnecting or malformed peer triggers a silent
//!   re-accept; only an unrecoverable listener error or [`Server::stop`]
//!   ends the worker.
//!
//! ## Example
//!
//! ```ignore
//! use probewire::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> probewire::Result<()> {
//!     let target = MyTarget::attach()?; // implements probewire::Target
//!     let mut server = Server::start(ServerConfig::default(), target).await?;
//!     println!("listening on {}", server.endpoint());
//!     // ... run the host application ...
//!     server.stop().await
//! }
//! ```

pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod server;
pub mod target;
pub mod transport;

pub use error::{ProbewireError, Result};
pub use server::{Server, ServerConfig};
pub use target::{RunState, Target};
