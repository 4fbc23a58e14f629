//! The command set.
//!
//! One frame carries a sequence of tagged commands. The set is closed and
//! versioned by the protocol itself; unknown tags fail the whole frame.

/// A single command tag within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Read one byte of target memory.
    Read8 = 0x00,
    /// Read a 16-bit value of target memory.
    Read16 = 0x01,
    /// Read a 32-bit value of target memory.
    Read32 = 0x02,
    /// Read a 64-bit value of target memory.
    Read64 = 0x03,
    /// Write one byte of target memory.
    Write8 = 0x04,
    /// Write a 16-bit value of target memory.
    Write16 = 0x05,
    /// Write a 32-bit value of target memory.
    Write32 = 0x06,
    /// Write a 64-bit value of target memory.
    Write64 = 0x07,
    /// Snapshot target state into a numbered slot.
    SaveState = 0x08,
    /// Restore target state from a numbered slot.
    LoadState = 0x09,
    /// Query the hosting build's version string.
    Version = 0x0A,
    /// Query the title of the loaded content.
    Title = 0x0B,
    /// Query the run status. The only opcode that needs no active session.
    Status = 0x0C,
    /// Query the serial identifier of the loaded content.
    Serial = 0x0D,
    /// Query the content checksum, rendered as 8 hex digits.
    Checksum = 0x0E,
    /// Query the loaded content's own version string.
    DiscVersion = 0x0F,
}

impl Opcode {
    /// Decode a wire tag. Returns `None` for tags outside the command set.
    pub fn from_u8(tag: u8) -> Option<Opcode> {
        Some(match tag {
            0x00 => Opcode::Read8,
            0x01 => Opcode::Read16,
            0x02 => Opcode::Read32,
            0x03 => Opcode::Read64,
            0x04 => Opcode::Write8,
            0x05 => Opcode::Write16,
            0x06 => Opcode::Write32,
            0x07 => Opcode::Write64,
            0x08 => Opcode::SaveState,
            0x09 => Opcode::LoadState,
            0x0A => Opcode::Version,
            0x0B => Opcode::Title,
            0x0C => Opcode::Status,
            0x0D => Opcode::Serial,
            0x0E => Opcode::Checksum,
            0x0F => Opcode::DiscVersion,
            _ => return None,
        })
    }

    /// Bytes this command consumes from the frame beyond its 1-byte tag.
    pub fn input_len(self) -> usize {
        match self {
            // 4-byte address
            Opcode::Read8 | Opcode::Read16 | Opcode::Read32 | Opcode::Read64 => 4,
            // 4-byte address plus the value
            Opcode::Write8 => 4 + 1,
            Opcode::Write16 => 4 + 2,
            Opcode::Write32 => 4 + 4,
            Opcode::Write64 => 4 + 8,
            // 1-byte slot index
            Opcode::SaveState | Opcode::LoadState => 1,
            Opcode::Version
            | Opcode::Title
            | Opcode::Status
            | Opcode::Serial
            | Opcode::Checksum
            | Opcode::DiscVersion => 0,
        }
    }

    /// Reply payload size, when it is known before touching the target.
    ///
    /// `None` for string-returning commands, whose reply size is the string
    /// length plus terminator and is validated at execution time.
    pub fn fixed_reply_len(self) -> Option<usize> {
        match self {
            Opcode::Read8 => Some(1),
            Opcode::Read16 => Some(2),
            Opcode::Read32 => Some(4),
            Opcode::Read64 => Some(8),
            Opcode::Write8
            | Opcode::Write16
            | Opcode::Write32
            | Opcode::Write64
            | Opcode::SaveState
            | Opcode::LoadState => Some(0),
            Opcode::Status => Some(4),
            Opcode::Version
            | Opcode::Title
            | Opcode::Serial
            | Opcode::Checksum
            | Opcode::DiscVersion => None,
        }
    }

    /// Whether this command requires [`Target::has_active_session`] to hold.
    ///
    /// [`Target::has_active_session`]: crate::target::Target::has_active_session
    pub fn needs_session(self) -> bool {
        !matches!(self, Opcode::Status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Opcode; 16] = [
        Opcode::Read8,
        Opcode::Read16,
        Opcode::Read32,
        Opcode::Read64,
        Opcode::Write8,
        Opcode::Write16,
        Opcode::Write32,
        Opcode::Write64,
        Opcode::SaveState,
        Opcode::LoadState,
        Opcode::Version,
        Opcode::Title,
        Opcode::Status,
        Opcode::Serial,
        Opcode::Checksum,
        Opcode::DiscVersion,
    ];

    #[test]
    fn test_tag_roundtrip() {
        for op in ALL {
            assert_eq!(Opcode::from_u8(op as u8), Some(op));
        }
    }

    #[test]
    fn test_unknown_tags_rejected() {
        for tag in 0x10..=0xFF {
            assert_eq!(Opcode::from_u8(tag), None);
        }
    }

    #[test]
    fn test_wire_tags_are_stable() {
        // The tag values are protocol, not implementation detail.
        assert_eq!(Opcode::Read32 as u8, 0x02);
        assert_eq!(Opcode::Write64 as u8, 0x07);
        assert_eq!(Opcode::SaveState as u8, 0x08);
        assert_eq!(Opcode::Status as u8, 0x0C);
        assert_eq!(Opcode::DiscVersion as u8, 0x0F);
    }

    #[test]
    fn test_argument_arity() {
        assert_eq!(Opcode::Read64.input_len(), 4);
        assert_eq!(Opcode::Write8.input_len(), 5);
        assert_eq!(Opcode::Write64.input_len(), 12);
        assert_eq!(Opcode::SaveState.input_len(), 1);
        assert_eq!(Opcode::Title.input_len(), 0);
        assert_eq!(Opcode::Status.input_len(), 0);
    }

    #[test]
    fn test_reply_arity() {
        assert_eq!(Opcode::Read8.fixed_reply_len(), Some(1));
        assert_eq!(Opcode::Read64.fixed_reply_len(), Some(8));
        assert_eq!(Opcode::Write32.fixed_reply_len(), Some(0));
        assert_eq!(Opcode::Status.fixed_reply_len(), Some(4));
        assert_eq!(Opcode::Title.fixed_reply_len(), None);
        assert_eq!(Opcode::Checksum.fixed_reply_len(), None);
    }

    #[test]
    fn test_only_status_skips_session_check() {
        for op in ALL {
            assert_eq!(op.needs_session(), op != Opcode::Status);
        }
    }
}
