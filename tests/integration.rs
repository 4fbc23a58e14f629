//! Integration tests for probewire.
//!
//! Each test starts a real server on its own slot and drives it through the
//! platform socket, exactly as an external tool would.

use probewire::protocol::wire;
use probewire::{RunState, Server, ServerConfig, Target};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Flat scratch memory standing in for a controlled process.
struct ScratchTarget {
    mem: Vec<u8>,
    session: bool,
    state: RunState,
}

impl ScratchTarget {
    fn new() -> Self {
        Self {
            mem: vec![0; 64 * 1024],
            session: true,
            state: RunState::Running,
        }
    }
}

impl Target for ScratchTarget {
    fn has_active_session(&self) -> bool {
        self.session
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
    fn save_to_slot(&mut self, _slot: u8) {}
    fn load_from_slot(&mut self, _slot: u8) {}
    fn title(&self) -> String {
        "Night Sky".to_string()
    }
    fn serial(&self) -> String {
        "SLUS-12345".to_string()
    }
    fn checksum(&self) -> u32 {
        0x0000BEEF
    }
    fn disc_version(&self) -> String {
        "2.10".to_string()
    }
    fn build_version(&self) -> String {
        "probewire 0.1.0".to_string()
    }
    fn run_state(&self) -> RunState {
        self.state
    }
}

#[cfg(unix)]
async fn connect(slot: u16) -> tokio::net::UnixStream {
    tokio::net::UnixStream::connect(probewire::transport::socket_path(slot))
        .await
        .expect("connect to control socket")
}

#[cfg(windows)]
async fn connect(slot: u16) -> tokio::net::TcpStream {
    tokio::net::TcpStream::connect(("127.0.0.1", slot))
        .await
        .expect("connect to control socket")
}

/// Wrap a command sequence in its length prefix.
fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 4) as u32).to_le_bytes().to_vec();
    out.extend_from_slice(body);
    out
}

/// Read one complete reply off the stream.
async fn read_reply<S: AsyncReadExt + Unpin>(stream: &mut S) -> Vec<u8> {
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await.expect("reply prefix");
    let total = u32::from_le_bytes(head) as usize;
    assert!(total >= 5, "reply shorter than its own header");
    let mut reply = head.to_vec();
    reply.resize(total, 0);
    stream.read_exact(&mut reply[4..]).await.expect("reply body");
    reply
}

async fn start(slot: u16, target: ScratchTarget) -> Server {
    Server::start(ServerConfig { slot }, target)
        .await
        .expect("server start")
}

const FAIL: [u8; 5] = [0x05, 0x00, 0x00, 0x00, 0xFF];

#[tokio::test]
async fn test_status_request_wire_scenario() {
    let mut server = start(43101, ScratchTarget::new()).await;
    let mut peer = connect(43101).await;

    peer.write_all(&[0x05, 0x00, 0x00, 0x00, 0x0C])
        .await
        .unwrap();
    let reply = read_reply(&mut peer).await;
    assert_eq!(reply, [0x09, 0x00, 0x00, 0x00, 0x00, 0, 0, 0, 0]);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_memory_read_without_session_fails() {
    let mut target = ScratchTarget::new();
    target.session = false;
    let mut server = start(43102, target).await;
    let mut peer = connect(43102).await;

    // Read32 at 0x10 with no session active
    peer.write_all(&[0x09, 0x00, 0x00, 0x00, 0x02, 0x10, 0x00, 0x00, 0x00])
        .await
        .unwrap();
    assert_eq!(read_reply(&mut peer).await, FAIL);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_write_then_read_roundtrip() {
    let mut server = start(43103, ScratchTarget::new()).await;
    let mut peer = connect(43103).await;

    let mut body = vec![0x07, 0x80, 0, 0, 0]; // Write64 at 0x80
    body.extend_from_slice(&0x1122334455667788u64.to_le_bytes());
    body.extend_from_slice(&[0x03, 0x80, 0, 0, 0]); // Read64 at 0x80
    peer.write_all(&frame(&body)).await.unwrap();

    let reply = read_reply(&mut peer).await;
    assert_eq!(reply[4], 0x00);
    assert_eq!(wire::read_u64(&reply, 5), 0x1122334455667788);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_empty_frame_succeeds() {
    let mut server = start(43104, ScratchTarget::new()).await;
    let mut peer = connect(43104).await;

    peer.write_all(&[0x04, 0x00, 0x00, 0x00]).await.unwrap();
    assert_eq!(read_reply(&mut peer).await, [0x05, 0, 0, 0, 0x00]);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_oversized_frame_rejected_without_reply() {
    let mut server = start(43105, ScratchTarget::new()).await;
    let mut peer = connect(43105).await;

    // declared total of 700000 exceeds the request ceiling; the server
    // silently discards it and keeps reading on the same connection
    peer.write_all(&700_000u32.to_le_bytes()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    peer.write_all(&frame(&[0x0C])).await.unwrap();
    let reply = read_reply(&mut peer).await;
    assert_eq!(reply[4], 0x00, "first reply belongs to the status request");
    assert_eq!(wire::read_u32(&reply, 5), 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_mid_frame_reaccepts_silently() {
    let mut server = start(43106, ScratchTarget::new()).await;

    {
        let mut peer = connect(43106).await;
        // 6 bytes of a declared 20-byte frame, then vanish
        peer.write_all(&[0x14, 0x00, 0x00, 0x00, 0x02, 0x10])
            .await
            .unwrap();
    }

    let mut peer = connect(43106).await;
    peer.write_all(&frame(&[0x0C])).await.unwrap();
    let reply = read_reply(&mut peer).await;
    assert_eq!(reply.len(), 9);
    assert_eq!(reply[4], 0x00);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_identity_queries() {
    let mut server = start(43107, ScratchTarget::new()).await;
    let mut peer = connect(43107).await;

    // Title, Serial, Checksum, DiscVersion, Version in one frame
    peer.write_all(&frame(&[0x0B, 0x0D, 0x0E, 0x0F, 0x0A]))
        .await
        .unwrap();
    let reply = read_reply(&mut peer).await;
    assert_eq!(reply[4], 0x00);

    let mut off = 5;
    for expected in ["Night Sky", "SLUS-12345", "0000beef", "2.10", "probewire 0.1.0"] {
        let size = wire::read_u32(&reply, off) as usize;
        assert_eq!(size, expected.len() + 1);
        off += 4;
        assert_eq!(&reply[off..off + expected.len()], expected.as_bytes());
        assert_eq!(reply[off + expected.len()], 0, "missing terminator");
        off += size;
    }
    assert_eq!(off, reply.len());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_partial_failure_discards_earlier_results() {
    let mut server = start(43108, ScratchTarget::new()).await;
    let mut peer = connect(43108).await;

    // a valid Status, then an unknown opcode
    peer.write_all(&frame(&[0x0C, 0x55])).await.unwrap();
    assert_eq!(read_reply(&mut peer).await, FAIL);

    // the connection is still usable afterwards
    peer.write_all(&frame(&[0x0C])).await.unwrap();
    assert_eq!(read_reply(&mut peer).await.len(), 9);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_sequential_frames_one_connection() {
    let mut server = start(43109, ScratchTarget::new()).await;
    let mut peer = connect(43109).await;

    for value in [0x11u8, 0x22, 0x33] {
        peer.write_all(&frame(&[0x04, 0x00, 0, 0, 0, value]))
            .await
            .unwrap();
        assert_eq!(read_reply(&mut peer).await, [0x05, 0, 0, 0, 0x00]);

        peer.write_all(&frame(&[0x00, 0x00, 0, 0, 0])).await.unwrap();
        let reply = read_reply(&mut peer).await;
        assert_eq!(reply[5], value);
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_save_state_passes_slot() {
    let mut server = start(43110, ScratchTarget::new()).await;
    let mut peer = connect(43110).await;

    peer.write_all(&frame(&[0x08, 0x02])).await.unwrap();
    assert_eq!(read_reply(&mut peer).await, [0x05, 0, 0, 0, 0x00]);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut server = start(43111, ScratchTarget::new()).await;
    server.stop().await.unwrap();
    server.stop().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_socket_file_lifecycle() {
    let path = probewire::transport::socket_path(43112);

    // a stale file from a crashed instance must not block the bind
    std::fs::write(&path, b"stale").unwrap();
    let mut server = start(43112, ScratchTarget::new()).await;
    let mut peer = connect(43112).await;
    peer.write_all(&frame(&[0x0C])).await.unwrap();
    assert_eq!(read_reply(&mut peer).await.len(), 9);

    server.stop().await.unwrap();
    assert!(!path.exists(), "socket file should be removed on stop");
}
