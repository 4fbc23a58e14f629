//! Loopback demo - a server and a hand-rolled client in one process.
//!
//! Starts a control server against an in-memory scratch target, then drives
//! it over the real platform socket the way an external tool would: a status
//! query, a memory write/read pair, and a title query.
//!
//! Run with:
//!
//! ```text
//! cargo run --example loopback
//! ```

use probewire::protocol::wire;
use probewire::{RunState, Server, ServerConfig, Target};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const DEMO_SLOT: u16 = 28051;

/// 64 KiB of zeroed scratch memory posing as a controlled process.
struct ScratchTarget {
    mem: Vec<u8>,
}

impl Target for ScratchTarget {
    fn has_active_session(&self) -> bool {
        true
    }
    fn read_u8(&self, addr: u32) -> u8 {
        self.mem[addr as usize]
    }
    fn read_u16(&self, addr: u32) -> u16 {
        wire::read_u16(&self.mem, addr as usize)
    }
    fn read_u32(&self, addr: u32) -> u32 {
        wire::read_u32(&self.mem, addr as usize)
    }
    fn read_u64(&self, addr: u32) -> u64 {
        wire::read_u64(&self.mem, addr as usize)
    }
    fn write_u8(&mut self, addr: u32, value: u8) {
        self.mem[addr as usize] = value;
    }
    fn write_u16(&mut self, addr: u32, value: u16) {
        wire::write_u16(&mut self.mem, addr as usize, value);
    }
    fn write_u32(&mut self, addr: u32, value: u32) {
        wire::write_u32(&mut self.mem, addr as usize, value);
    }
    fn write_u64(&mut self, addr: u32, value: u64) {
        wire::write_u64(&mut self.mem, addr as usize, value);
    }
    fn save_to_slot(&mut self, slot: u8) {
        tracing::info!(slot, "save requested");
    }
    fn load_from_slot(&mut self, slot: u8) {
        tracing::info!(slot, "load requested");
    }
    fn title(&self) -> String {
        "Loopback Demo".to_string()
    }
    fn serial(&self) -> String {
        "DEMO-00001".to_string()
    }
    fn checksum(&self) -> u32 {
        0xC0FFEE00
    }
    fn disc_version(&self) -> String {
        "1.00".to_string()
    }
    fn build_version(&self) -> String {
        format!("probewire {}", env!("CARGO_PKG_VERSION"))
    }
    fn run_state(&self) -> RunState {
        RunState::Running
    }
}

#[cfg(unix)]
async fn connect() -> std::io::Result<tokio::net::UnixStream> {
    tokio::net::UnixStream::connect(probewire::transport::socket_path(DEMO_SLOT)).await
}

#[cfg(windows)]
async fn connect() -> std::io::Result<tokio::net::TcpStream> {
    tokio::net::TcpStream::connect(("127.0.0.1", DEMO_SLOT)).await
}

/// Send one command sequence and collect the complete reply.
async fn request<S>(stream: &mut S, body: &[u8]) -> std::io::Result<Vec<u8>>
where
    S: AsyncReadExt + AsyncWriteExt + Unpin,
{
    let mut out = ((body.len() + 4) as u32).to_le_bytes().to_vec();
    out.extend_from_slice(body);
    stream.write_all(&out).await?;

    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await?;
    let mut reply = head.to_vec();
    reply.resize(u32::from_le_bytes(head) as usize, 0);
    stream.read_exact(&mut reply[4..]).await?;
    Ok(reply)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let target = ScratchTarget {
        mem: vec![0; 64 * 1024],
    };
    let mut server = Server::start(ServerConfig { slot: DEMO_SLOT }, target).await?;
    println!("serving on {}", server.endpoint());

    let mut peer = connect().await?;

    // status query
    let reply = request(&mut peer, &[0x0C]).await?;
    println!("run state: {}", wire::read_u32(&reply, 5));

    // write a dword, read it back
    let reply = request(
        &mut peer,
        &[
            0x06, 0x40, 0, 0, 0, 0xEF, 0xBE, 0xAD, 0xDE, // Write32 @0x40
            0x02, 0x40, 0, 0, 0, // Read32 @0x40
        ],
    )
    .await?;
    println!("read back: {:#010x}", wire::read_u32(&reply, 5));

    // title query: u32 size, bytes, NUL
    let reply = request(&mut peer, &[0x0B]).await?;
    let size = wire::read_u32(&reply, 5) as usize;
    let title = std::str::from_utf8(&reply[9..9 + size - 1])?;
    println!("title: {title}");

    drop(peer);
    server.stop().await?;
    Ok(())
}
