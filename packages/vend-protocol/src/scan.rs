use core::iter::FusedIterator;

use crate::{
    FRAME_OVERHEAD, START_MARKER,
    decode::{DecodeError, DecodeErrorKind},
    frame::{DecodedFrame, decode, read_length_field},
};

/// Where a [`FrameScanner`] resumes after it has decoded a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScanAdvance {
    /// Resume directly after the frame's checksum trailer.
    #[default]
    FullFrame,
    /// Resume `length + 1` bytes after the start marker, i.e. inside the frame.
    ///
    /// Any start marker byte in the rest of the frame is picked up as a new frame.
    LengthField,
    /// Resume one byte after the end of the frame, like the desktop terminal
    /// tool. A frame that immediately follows another one is skipped.
    FullFramePlusOne,
}

impl ScanAdvance {
    fn next_offset(self, start: usize, length: usize) -> usize {
        match self {
            Self::FullFrame => start + length + FRAME_OVERHEAD,
            Self::LengthField => start + length + 1,
            Self::FullFramePlusOne => start + length + FRAME_OVERHEAD + 1,
        }
    }
}

/// Lazily walks a captured buffer and decodes every frame in it.
///
/// Bytes outside of frames are skipped. The first error ends the scan: a
/// frame running past the end of the buffer yields
/// [`DecodeErrorKind::UnexpectedEnd`], a bad length field yields
/// [`DecodeErrorKind::MalformedLength`].
#[derive(Debug, Clone)]
pub struct FrameScanner<'a> {
    buffer: &'a [u8],
    offset: usize,
    advance: ScanAdvance,
    done: bool,
}

impl<'a> FrameScanner<'a> {
    pub fn new(buffer: &'a [u8], advance: ScanAdvance) -> Self {
        Self {
            buffer,
            offset: 0,
            advance,
            done: false,
        }
    }

    /// Position of the scan cursor within the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn decode_at(&self, start: usize) -> Result<(&'a [u8], DecodedFrame, usize), DecodeError> {
        let length = read_length_field(&self.buffer[start..])?;
        let bytes = self
            .buffer
            .get(start..start + length + FRAME_OVERHEAD)
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;

        Ok((bytes, decode(bytes)?, length))
    }

    /// Like [`Iterator::next`], but also hands out the frame's bytes within
    /// the scanned buffer.
    pub fn next_with_bytes(&mut self) -> Option<Result<(&'a [u8], DecodedFrame), DecodeError>> {
        if self.done {
            return None;
        }

        while self.offset < self.buffer.len() {
            if self.buffer[self.offset] != START_MARKER {
                self.offset += 1;
                continue;
            }

            let start = self.offset;
            return Some(match self.decode_at(start) {
                Ok((bytes, frame, length)) => {
                    self.offset = self.advance.next_offset(start, length);
                    Ok((bytes, frame))
                }
                Err(e) => {
                    self.done = true;
                    Err(e)
                }
            });
        }

        self.done = true;
        None
    }
}

impl Iterator for FrameScanner<'_> {
    type Item = Result<DecodedFrame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with_bytes()
            .map(|result| result.map(|(_, frame)| frame))
    }
}

impl FusedIterator for FrameScanner<'_> {}

/// Scans `buffer` for frames, resuming after each whole frame.
pub fn scan(buffer: &[u8]) -> FrameScanner<'_> {
    FrameScanner::new(buffer, ScanAdvance::default())
}

/// Scans `buffer` for frames with the given resume policy.
pub fn scan_with(buffer: &[u8], advance: ScanAdvance) -> FrameScanner<'_> {
    FrameScanner::new(buffer, advance)
}
