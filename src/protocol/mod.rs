//! Protocol module - wire encoding and the opcode table.
//!
//! This module defines the binary protocol for the control socket:
//! - Little-endian integer encoding/decoding at buffer offsets
//! - Frame and reply size limits
//! - The closed set of opcodes with their argument and reply arities

mod opcode;
pub mod wire;

pub use opcode::Opcode;
pub use wire::{
    LENGTH_PREFIX_SIZE, MAX_REPLY_SIZE, MAX_REQUEST_SIZE, REPLY_HEADER_SIZE, STATUS_FAIL,
    STATUS_OK,
};
