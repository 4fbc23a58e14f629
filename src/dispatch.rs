//! Command dispatcher.
//!
//! Interprets one framed message as a sequence of opcodes, validates every
//! access against both the frame and the reply buffer before performing it,
//! calls out to the [`Target`], and accumulates a reply. The first failing
//! command aborts the whole frame: partial output from earlier commands is
//! discarded and the reply becomes the fixed 5-byte failure form, so a reply
//! never describes a half-executed frame.
//!
//! The reply buffer is owned by the server and reused across requests;
//! [`dispatch`] borrows it exclusively for the duration of one frame.

use bytes::{BufMut, BytesMut};

use crate::protocol::wire;
use crate::protocol::{Opcode, MAX_REPLY_SIZE, REPLY_HEADER_SIZE, STATUS_FAIL, STATUS_OK};
use crate::target::Target;

/// Outcome of executing one command.
enum Step {
    /// Command executed; advance the cursor past its tag and arguments.
    Continue { consumed: usize },
    /// Abort the frame.
    Fail,
}

/// Bounds check applied before every buffer access.
///
/// Rejects when the command's declared input span steps outside the frame,
/// when its output would exceed the reply buffer's fixed capacity, or when
/// either sum overflows. Sizes are always computed from declared arities and
/// actual string lengths, never from values embedded deeper in the payload.
fn bounds_ok(
    cursor: usize,
    input_needed: usize,
    reply_len: usize,
    output_needed: usize,
    frame_len: usize,
) -> bool {
    let input_end = match cursor.checked_add(input_needed) {
        Some(end) => end,
        None => return false,
    };
    let output_end = match reply_len.checked_add(output_needed) {
        Some(end) => end,
        None => return false,
    };
    input_end <= frame_len && output_end <= MAX_REPLY_SIZE
}

/// Execute one frame body (length prefix already stripped) against `target`.
///
/// On return, `reply` holds the complete wire reply: either
/// `[u32 size][OK][payloads...]` with one payload per command in request
/// order, or the 5-byte `[u32 5][FAIL]` form.
pub fn dispatch<T: Target + ?Sized>(frame: &[u8], reply: &mut BytesMut, target: &mut T) {
    reply.clear();
    reply.put_bytes(0, REPLY_HEADER_SIZE);

    let mut cursor = 0;
    while cursor < frame.len() {
        if !bounds_ok(cursor, 1, reply.len(), 0, frame.len()) {
            return make_fail(reply);
        }
        match execute(frame, cursor, reply, target) {
            Step::Continue { consumed } => cursor += consumed,
            Step::Fail => return make_fail(reply),
        }
    }

    let total = reply.len();
    wire::write_u32(reply, 0, total as u32);
    wire::write_u8(reply, 4, STATUS_OK);
}

/// Execute the single command at `cursor`.
fn execute<T: Target + ?Sized>(
    frame: &[u8],
    cursor: usize,
    reply: &mut BytesMut,
    target: &mut T,
) -> Step {
    let op = match Opcode::from_u8(wire::read_u8(frame, cursor)) {
        Some(op) => op,
        None => return Step::Fail,
    };
    if op.needs_session() && !target.has_active_session() {
        return Step::Fail;
    }

    let args = cursor + 1;

    // Fixed-arity commands validate both spans up front; string commands
    // size their output only after querying the target.
    if let Some(reply_len) = op.fixed_reply_len() {
        if !bounds_ok(args, op.input_len(), reply.len(), reply_len, frame.len()) {
            return Step::Fail;
        }
    }

    match op {
        Opcode::Read8 => reply.put_u8(target.read_u8(wire::read_u32(frame, args))),
        Opcode::Read16 => reply.put_u16_le(target.read_u16(wire::read_u32(frame, args))),
        Opcode::Read32 => reply.put_u32_le(target.read_u32(wire::read_u32(frame, args))),
        Opcode::Read64 => reply.put_u64_le(target.read_u64(wire::read_u32(frame, args))),

        Opcode::Write8 => {
            target.write_u8(wire::read_u32(frame, args), wire::read_u8(frame, args + 4))
        }
        Opcode::Write16 => {
            target.write_u16(wire::read_u32(frame, args), wire::read_u16(frame, args + 4))
        }
        Opcode::Write32 => {
            target.write_u32(wire::read_u32(frame, args), wire::read_u32(frame, args + 4))
        }
        Opcode::Write64 => {
            target.write_u64(wire::read_u32(frame, args), wire::read_u64(frame, args + 4))
        }

        Opcode::SaveState => target.save_to_slot(wire::read_u8(frame, args)),
        Opcode::LoadState => target.load_from_slot(wire::read_u8(frame, args)),

        Opcode::Status => reply.put_u32_le(target.run_state().wire_value()),

        Opcode::Version => return string_reply(reply, &target.build_version(), args, frame.len()),
        Opcode::Title => return string_reply(reply, &target.title(), args, frame.len()),
        Opcode::Serial => return string_reply(reply, &target.serial(), args, frame.len()),
        Opcode::Checksum => {
            return string_reply(reply, &format!("{:08x}", target.checksum()), args, frame.len())
        }
        Opcode::DiscVersion => {
            return string_reply(reply, &target.disc_version(), args, frame.len())
        }
    }

    Step::Continue {
        consumed: 1 + op.input_len(),
    }
}

/// Append a string result: u32 size field (length + terminator), the bytes,
/// then one NUL.
fn string_reply(reply: &mut BytesMut, text: &str, cursor: usize, frame_len: usize) -> Step {
    let size = text.len() + 1;
    if !bounds_ok(cursor, 0, reply.len(), size + 4, frame_len) {
        return Step::Fail;
    }
    reply.put_u32_le(size as u32);
    reply.put_slice(text.as_bytes());
    reply.put_u8(0);
    Step::Continue { consumed: 1 }
}

/// Overwrite whatever accumulated with the fixed failure reply.
fn make_fail(reply: &mut BytesMut) {
    reply.clear();
    reply.put_u32_le(REPLY_HEADER_SIZE as u32);
    reply.put_u8(STATUS_FAIL);
}
