use alloc::string::String;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Message index {input:?} is not a valid integer.")]
    InvalidIndex { input: String },

    #[error("Frame length {length} does not fit in the three-digit length field.")]
    LengthOverflow { length: usize },
}

/// A type that can be encoded into a sequence of bytes.
pub trait Encode {
    /// Returns the number of bytes this value will take when encoded.
    fn size(&self) -> usize;

    /// Encodes this instance into the provided byte slice.
    fn encode(&self, data: &mut [u8]);
}

impl Encode for u8 {
    fn size(&self) -> usize {
        1
    }

    fn encode(&self, data: &mut [u8]) {
        data[0] = *self;
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn size(&self) -> usize {
        N
    }

    fn encode(&self, data: &mut [u8]) {
        data[..N].copy_from_slice(self);
    }
}

/// Text written one byte per character.
///
/// Characters outside of ASCII are replaced with `?`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ascii<'a>(pub &'a str);

impl Encode for Ascii<'_> {
    fn size(&self) -> usize {
        self.0.chars().count()
    }

    fn encode(&self, data: &mut [u8]) {
        for (byte, c) in data.iter_mut().zip(self.0.chars()) {
            *byte = if c.is_ascii() { c as u8 } else { b'?' };
        }
    }
}

/// Sequentially writes [`Encode`] values into a byte slice.
pub struct MessageEncoder<'a> {
    data: &'a mut [u8],
    position: usize,
}

impl<'a> MessageEncoder<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Encodes `value` at the current position and moves past it.
    pub fn write<T: Encode + ?Sized>(&mut self, value: &T) {
        value.encode(&mut self.data[self.position..]);
        self.position += value.size();
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_replacement() {
        let text = Ascii("a\u{e9}b");
        let mut buf = [0; 3];
        text.encode(&mut buf);

        assert_eq!(text.size(), 3);
        assert_eq!(&buf, b"a?b");
    }

    #[test]
    fn encoder_position() {
        let mut buf = [0; 6];
        let mut enc = MessageEncoder::new(&mut buf);
        enc.write(&0x02u8);
        enc.write(b"005");
        enc.write(&Ascii("ab"));

        assert_eq!(enc.position(), 6);
        assert_eq!(&buf, b"\x02005ab");
    }
}
