use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    type_name: &'static str,
}

impl DecodeError {
    pub fn new<T: ?Sized>(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Failed to decode {}: {}", self.type_name, self.kind)
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("Frame was too short.")]
    UnexpectedEnd,

    #[error("Length field {bytes:02x?} is not three ASCII digits.")]
    MalformedLength { bytes: [u8; 3] },

    #[error(
        "Could not decode {name} with unexpected byte. Found {value:x}, expected one of: {expected:x?}."
    )]
    UnexpectedByte {
        name: &'static str,
        value: u8,
        expected: &'static [u8],
    },

    #[error("Frame is {found} bytes long, but its length field implies {expected}.")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Checksum mismatch. Found {found:02x?}, expected {expected:02x?}.")]
    Checksum { found: [u8; 4], expected: [u8; 4] },
}

/// A type that can be reconstructed (decoded) from a raw sequence of bytes.
///
/// The input slice is advanced by the number of bytes consumed.
pub trait Decode {
    /// Attempts to decode `Self` from the beginning of the provided byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or too short.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

impl Decode for u8 {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let (&byte, rest) = data
            .split_first()
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
        *data = rest;
        Ok(byte)
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let (bytes, rest) = data
            .split_first_chunk::<N>()
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;
        *data = rest;
        Ok(*bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_input() {
        let mut data: &[u8] = b"\x02005";

        assert_eq!(u8::decode(&mut data), Ok(0x02));
        assert_eq!(<[u8; 3]>::decode(&mut data), Ok(*b"005"));
        assert!(data.is_empty());
    }

    #[test]
    fn short_input() {
        let mut data: &[u8] = b"00";
        let err = <[u8; 3]>::decode(&mut data).unwrap_err();

        assert_eq!(err.kind(), DecodeErrorKind::UnexpectedEnd);
        assert_eq!(data, b"00");
    }
}
