use core::fmt;

use crate::encode::Encode;

/// Bit-reversed CCITT polynomial the checksum engine shifts against.
pub const CHECKSUM_POLY: u16 = 0x8408;

/// Combines a running checksum `state` with one input byte.
///
/// The byte is placed above the 16-bit state and the resulting 24-bit value is
/// shifted out eight times against [`CHECKSUM_POLY`]. This is the "augmented"
/// form of CRC-16/KERMIT: folding it over `bytes ++ [0, 0]` yields the KERMIT
/// checksum of `bytes`.
#[inline]
pub const fn checksum_update(state: u16, byte: u8) -> u16 {
    let mut x = ((byte as u32) << 16) + state as u32;

    let mut i = 0;
    while i < 8 {
        x = if x & 1 != 0 {
            (x >> 1) ^ CHECKSUM_POLY as u32
        } else {
            x >> 1
        };
        i += 1;
    }

    x as u16
}

/// Folds [`checksum_update`] over `bytes`, starting from zero.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0, |state, &byte| checksum_update(state, byte))
}

/// Running checksum over a byte sequence delivered in pieces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Checksum {
    state: u16,
}

impl Checksum {
    pub const fn new() -> Self {
        Self { state: 0 }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = checksum_update(self.state, byte);
        }
    }

    pub const fn value(&self) -> u16 {
        self.state
    }
}

/// Letter case used for the hex digits of the checksum field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HexCase {
    #[default]
    Lower,
    Upper,
}

/// How the checksum text fit into the fixed 4-byte trailer.
///
/// The trailer holds `hex(checksum) + " "` with at least two digits, which is
/// anywhere from 3 to 5 bytes long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumFit {
    /// Three digits and the trailing space, exactly 4 bytes.
    Fits,
    /// Four digits; the trailing space did not fit and was dropped.
    Truncated,
    /// Two digits and the trailing space; the last byte is an extra space.
    Padded,
}

/// The 4-byte ASCII checksum trailer of a frame.
///
/// # Encoding
///
/// | Checksum          | Text      | Field    | Fit                       |
/// |-------------------|-----------|----------|---------------------------|
/// | `0x0000..=0x00FF` | `"24 "`   | `"24  "` | [`ChecksumFit::Padded`]    |
/// | `0x0100..=0x0FFF` | `"569 "`  | `"569 "` | [`ChecksumFit::Fits`]      |
/// | `0x1000..=0xFFFF` | `"4091 "` | `"4091"` | [`ChecksumFit::Truncated`] |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChecksumField {
    value: u16,
    bytes: [u8; 4],
    fit: ChecksumFit,
}

impl ChecksumField {
    /// Width of the checksum trailer on the wire.
    pub const SIZE: usize = 4;

    pub fn new(value: u16, case: HexCase) -> Self {
        let digits = match value {
            0..=0xFF => 2,
            0x100..=0xFFF => 3,
            _ => 4,
        };
        let table = match case {
            HexCase::Lower => b"0123456789abcdef",
            HexCase::Upper => b"0123456789ABCDEF",
        };

        let mut bytes = [b' '; Self::SIZE];
        for (i, byte) in bytes.iter_mut().take(digits).enumerate() {
            let shift = 4 * (digits - 1 - i);
            *byte = table[((value >> shift) & 0xF) as usize];
        }

        let fit = match digits {
            2 => ChecksumFit::Padded,
            3 => ChecksumFit::Fits,
            _ => ChecksumFit::Truncated,
        };

        Self { value, bytes, fit }
    }

    pub const fn value(&self) -> u16 {
        self.value
    }

    pub const fn fit(&self) -> ChecksumFit {
        self.fit
    }

    pub const fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.bytes
    }

    /// Returns `true` if `found` carries this checksum in either letter case.
    pub fn matches(&self, found: &[u8]) -> bool {
        found.eq_ignore_ascii_case(&self.bytes)
    }
}

impl Encode for ChecksumField {
    fn size(&self) -> usize {
        Self::SIZE
    }

    fn encode(&self, data: &mut [u8]) {
        data[..Self::SIZE].copy_from_slice(&self.bytes);
    }
}

impl fmt::Display for ChecksumField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.bytes {
            write!(f, "{}", byte as char)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERMIT: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_KERMIT);

    #[test]
    fn update_vectors() {
        assert_eq!(checksum_update(0, 0x01), 0x0100);
        assert_eq!(checksum_update(0x1234, 0xAB), 0xDCB5);
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b"123456789"), 0x507F);
    }

    #[test]
    fn augmented_kermit() {
        // Two trailing zero bytes flush the state through the register.
        let inputs: [&[u8]; 4] = [b"123456789", b"abc", b"\x02005 107\x03", &[0xFF; 32]];
        for input in inputs {
            let mut engine = Checksum::new();
            engine.update(input);
            engine.update(&[0, 0]);

            assert_eq!(engine.value(), KERMIT.checksum(input));
        }
    }

    #[test]
    fn running_matches_oneshot() {
        let data = b"005 107\x01\x03";
        let mut engine = Checksum::new();
        engine.update(&data[..3]);
        engine.update(&data[3..]);

        assert_eq!(engine.value(), checksum(data));
    }

    #[test]
    fn single_byte_change() {
        let original = checksum(b"0051071\x03");
        let changed = checksum(b"0051072\x03");

        assert_ne!(original, changed);
    }

    #[test]
    fn field_widths() {
        let padded = ChecksumField::new(0x24, HexCase::Lower);
        assert_eq!(padded.as_bytes(), b"24  ");
        assert_eq!(padded.fit(), ChecksumFit::Padded);

        let fits = ChecksumField::new(0x569, HexCase::Lower);
        assert_eq!(fits.as_bytes(), b"569 ");
        assert_eq!(fits.fit(), ChecksumFit::Fits);

        let truncated = ChecksumField::new(0x4091, HexCase::Lower);
        assert_eq!(truncated.as_bytes(), b"4091");
        assert_eq!(truncated.fit(), ChecksumFit::Truncated);

        assert_eq!(ChecksumField::new(0, HexCase::Lower).as_bytes(), b"00  ");
    }

    #[test]
    fn field_case() {
        let upper = ChecksumField::new(0x70D, HexCase::Upper);
        let lower = ChecksumField::new(0x70D, HexCase::Lower);

        assert_eq!(upper.as_bytes(), b"70D ");
        assert_eq!(lower.as_bytes(), b"70d ");
        assert!(lower.matches(upper.as_bytes()));
        assert!(!lower.matches(b"70e "));
    }
}
