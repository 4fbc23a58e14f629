//! Target process interface.
//!
//! The server itself never touches the controlled process: every memory
//! access, state operation, and identity query goes through the [`Target`]
//! trait, implemented by the embedder. All calls are synchronous and expected
//! to be fast — the worker serves one request at a time and cannot accept a
//! new connection while a collaborator call is in flight.

/// Run status reported by [`Target::run_state`].
///
/// The Status opcode encodes this as a little-endian u32 in the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The target is executing.
    Running,
    /// The target is loaded but paused.
    Paused,
    /// No target is executing (shut down, crashed, never started).
    Stopped,
}

impl RunState {
    /// Wire encoding of this state (Running = 0, Paused = 1, Stopped = 2).
    #[inline]
    pub fn wire_value(self) -> u32 {
        match self {
            RunState::Running => 0,
            RunState::Paused => 1,
            RunState::Stopped => 2,
        }
    }
}

/// The controlled process, as seen by the dispatcher.
///
/// Addresses are 32-bit offsets into whatever address space the embedder
/// exposes; the dispatcher passes them through untouched. Multi-byte reads
/// and writes use the target's native layout — the protocol does not swap
/// them.
pub trait Target {
    /// Whether a target is loaded and its memory/state may be touched.
    ///
    /// Every opcode except Status fails its whole frame when this is false.
    fn has_active_session(&self) -> bool;

    /// Read one byte at `addr`.
    fn read_u8(&self, addr: u32) -> u8;
    /// Read a 16-bit value at `addr`.
    fn read_u16(&self, addr: u32) -> u16;
    /// Read a 32-bit value at `addr`.
    fn read_u32(&self, addr: u32) -> u32;
    /// Read a 64-bit value at `addr`.
    fn read_u64(&self, addr: u32) -> u64;

    /// Write one byte at `addr`.
    fn write_u8(&mut self, addr: u32, value: u8);
    /// Write a 16-bit value at `addr`.
    fn write_u16(&mut self, addr: u32, value: u16);
    /// Write a 32-bit value at `addr`.
    fn write_u32(&mut self, addr: u32, value: u32);
    /// Write a 64-bit value at `addr`.
    fn write_u64(&mut self, addr: u32, value: u64);

    /// Snapshot the target's state into the numbered slot.
    fn save_to_slot(&mut self, slot: u8);
    /// Restore the target's state from the numbered slot.
    fn load_from_slot(&mut self, slot: u8);

    /// Human-readable title of whatever the target is running.
    fn title(&self) -> String;
    /// Serial identifier of the loaded content.
    fn serial(&self) -> String;
    /// Content checksum; the Checksum opcode renders it as 8 hex digits.
    fn checksum(&self) -> u32;
    /// Version string of the loaded content.
    fn disc_version(&self) -> String;
    /// Version string identifying the hosting build itself.
    fn build_version(&self) -> String;

    /// Current run status. The only query that works without a session.
    fn run_state(&self) -> RunState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_wire_values() {
        assert_eq!(RunState::Running.wire_value(), 0);
        assert_eq!(RunState::Paused.wire_value(), 1);
        assert_eq!(RunState::Stopped.wire_value(), 2);
    }
}
