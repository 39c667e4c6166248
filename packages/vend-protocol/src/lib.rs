//! Implementation of the STX/ETX framing protocol spoken by vending machine controllers.
//!
//! Every message exchanged with the machine is a [`Frame`]:
//!
//! | Field      | Size | Encoding |
//! |------------|------|----------|
//! | `start`    | 1    | [`START_MARKER`] |
//! | `length`   | 3    | ASCII decimal, zero-padded: `1 + command + data` |
//! | `index`    | 1    | raw byte |
//! | `command`  | n    | ASCII |
//! | `data`     | m    | ASCII |
//! | `end`      | 1    | [`END_MARKER`] |
//! | `checksum` | 4    | [`ChecksumField`] |
//!
//! There is no escaping, so a frame is found by its start marker and cut out
//! using the length field. [`scan`] does this over a captured buffer and
//! [`FrameBuffer`] does it incrementally as bytes arrive.

#![no_std]

extern crate alloc;

mod buffer;
mod checks;
mod checksum;
mod decode;
mod encode;
mod frame;
mod names;
mod scan;

pub use buffer::FrameBuffer;
pub use checks::FrameChecks;
pub use checksum::{
    CHECKSUM_POLY, Checksum, ChecksumField, ChecksumFit, HexCase, checksum, checksum_update,
};
pub use decode::{Decode, DecodeError, DecodeErrorKind};
pub use encode::{Encode, EncodeError, MessageEncoder};
pub use frame::{DecodedFrame, Frame, decode, encode, read_length_field};
pub use names::UnknownOption;
pub use scan::{FrameScanner, ScanAdvance, scan, scan_with};

/// First byte of every frame.
pub const START_MARKER: u8 = 0x02;

/// Byte separating a frame's payload from its checksum trailer.
pub const END_MARKER: u8 = 0x03;

/// Bytes of a frame not counted by its length field: start marker, length
/// field, end marker and checksum.
pub const FRAME_OVERHEAD: usize = 9;

/// Largest value the three-digit length field can carry.
pub const MAX_LENGTH: usize = 999;
