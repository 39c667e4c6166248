//! Frame buffer for accumulating partial reads.
//!
//! Serial reads hand over whatever bytes have arrived, so a frame may be split
//! across any number of reads. [`FrameBuffer`] keeps the leftovers and cuts
//! complete frames off the front as soon as their length field says they are
//! whole.
//!
//! # Example
//!
//! ```
//! use vend_protocol::{FrameBuffer, decode, encode};
//!
//! let frame = encode("32", "107", "1").unwrap();
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push(&frame[..5]).unwrap().is_empty());
//! let frames = buffer.push(&frame[5..]).unwrap();
//!
//! assert_eq!(decode(&frames[0]).unwrap().command, "107");
//! ```

use alloc::vec::Vec;
use bytes::{Buf, Bytes, BytesMut};

use crate::{FRAME_OVERHEAD, START_MARKER, decode::DecodeError, frame::read_length_field};

/// Start marker plus the three length digits.
const PREFIX_SIZE: usize = 4;

/// Buffer for accumulating incoming bytes and extracting complete frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
    /// Error found while draining a push that already produced frames.
    pending_error: Option<DecodeError>,
}

impl FrameBuffer {
    /// Creates a new frame buffer sized for a handful of frames.
    pub fn new() -> Self {
        Self::with_capacity(4 * 1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            pending_error: None,
        }
    }

    /// Pushes data into the buffer and extracts all complete frames.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed length field. If frames were already
    /// extracted by this call they are returned instead, and the error is
    /// reported by the next call to [`next_frame`](Self::next_frame) or
    /// [`push`](Self::push).
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>, DecodeError> {
        self.extend(data);

        let mut frames = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) if frames.is_empty() => return Err(e),
                Err(e) => {
                    self.pending_error = Some(e);
                    break;
                }
            }
        }

        Ok(frames)
    }

    /// Appends data to the buffer without extracting frames.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Tries to cut one complete frame off the front of the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the frame at the front has a malformed length field.
    ///   Its start marker is dropped so the next call resynchronises.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>, DecodeError> {
        if let Some(e) = self.pending_error.take() {
            return Err(e);
        }

        // Anything before a start marker cannot belong to a frame.
        match self.buffer.iter().position(|&byte| byte == START_MARKER) {
            Some(0) => {}
            Some(skip) => {
                self.buffer.advance(skip);
            }
            None => {
                self.buffer.clear();
                return Ok(None);
            }
        }

        if self.buffer.len() < PREFIX_SIZE {
            return Ok(None);
        }

        let length = match read_length_field(&self.buffer) {
            Ok(length) => length,
            Err(e) => {
                self.buffer.advance(1);
                return Err(e);
            }
        };

        let size = length + FRAME_OVERHEAD;
        if self.buffer.len() < size {
            return Ok(None);
        }

        Ok(Some(self.buffer.split_to(size).freeze()))
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and forget any pending error.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending_error = None;
    }
}
