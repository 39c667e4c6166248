//! Frame encoding and decoding.

use alloc::{
    string::{String, ToString},
    vec,
    vec::Vec,
};

use crate::{
    END_MARKER, FRAME_OVERHEAD, MAX_LENGTH, START_MARKER,
    checks::FrameChecks,
    checksum::{ChecksumField, HexCase, checksum},
    decode::{Decode, DecodeError, DecodeErrorKind},
    encode::{Ascii, Encode, EncodeError, MessageEncoder},
};

/// Offset of the first command byte.
const COMMAND_OFFSET: usize = 5;

/// An outgoing frame.
///
/// # Encoding
///
/// | Field      | Size | Description |
/// |------------|------|-------------|
/// | `start`    | 1    | Must be [`START_MARKER`]. |
/// | `length`   | 3    | `1 + command + data`, as zero-padded ASCII decimal. |
/// | `index`    | 1    | Raw message index. |
/// | `command`  | n    | ASCII command code. |
/// | `data`     | m    | ASCII payload, possibly empty. |
/// | `end`      | 1    | Must be [`END_MARKER`]. |
/// | `checksum` | 4    | [`ChecksumField`] over `length` through `end`. |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    index: u8,
    command: String,
    data: String,
}

impl Frame {
    /// Creates a new frame.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::LengthOverflow`] if `1 + command + data` is
    /// larger than [`MAX_LENGTH`] characters.
    pub fn new(
        index: u8,
        command: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<Self, EncodeError> {
        let frame = Self {
            index,
            command: command.into(),
            data: data.into(),
        };

        let length = frame.length();
        if length > MAX_LENGTH {
            return Err(EncodeError::LengthOverflow { length });
        }

        Ok(frame)
    }

    /// Creates a new frame from a textual message index.
    ///
    /// The index may be any signed 32-bit decimal, surrounded by whitespace.
    /// Only its low 8 bits are sent, so `"300"` becomes `44` and `"-1"`
    /// becomes `255`.
    pub fn parse(
        index: &str,
        command: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<Self, EncodeError> {
        let value: i32 = index
            .trim()
            .parse()
            .map_err(|_| EncodeError::InvalidIndex {
                input: index.to_string(),
            })?;

        Self::new(value as u8, command, data)
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Value of the length field: the index byte, command and data.
    pub fn length(&self) -> usize {
        1 + Ascii(&self.command).size() + Ascii(&self.data).size()
    }

    /// Encodes this frame with the given checksum letter case.
    pub fn to_bytes(&self, case: HexCase) -> Vec<u8> {
        let mut bytes = vec![0; self.size()];
        self.encode_with_case(&mut bytes, case);
        bytes
    }

    fn encode_with_case(&self, data: &mut [u8], case: HexCase) {
        let body_end = {
            let mut enc = MessageEncoder::new(data);
            enc.write(&START_MARKER);
            enc.write(&length_digits(self.length()));
            enc.write(&self.index);
            enc.write(&Ascii(&self.command));
            enc.write(&Ascii(&self.data));
            enc.write(&END_MARKER);
            enc.position()
        };

        // The start marker is not covered by the checksum.
        ChecksumField::new(checksum(&data[1..body_end]), case).encode(&mut data[body_end..]);
    }
}

impl Encode for Frame {
    fn size(&self) -> usize {
        self.length() + FRAME_OVERHEAD
    }

    fn encode(&self, data: &mut [u8]) {
        self.encode_with_case(data, HexCase::default());
    }
}

fn length_digits(length: usize) -> [u8; 3] {
    [
        b'0' + (length / 100 % 10) as u8,
        b'0' + (length / 10 % 10) as u8,
        b'0' + (length % 10) as u8,
    ]
}

/// Encodes a frame from the fields of a send form.
///
/// # Errors
///
/// Fails if `index` is not an integer or the frame is too long.
pub fn encode(index: &str, command: &str, data: &str) -> Result<Vec<u8>, EncodeError> {
    Ok(Frame::parse(index, command, data)?.to_bytes(HexCase::default()))
}

/// Reads the three-digit length field of a frame starting with its start marker.
///
/// # Errors
///
/// Returns [`DecodeErrorKind::UnexpectedEnd`] if `frame` holds fewer than four
/// bytes and [`DecodeErrorKind::MalformedLength`] if the field is not made of
/// ASCII digits.
pub fn read_length_field(frame: &[u8]) -> Result<usize, DecodeError> {
    let bytes = frame
        .get(1..4)
        .ok_or_else(|| DecodeError::new::<Frame>(DecodeErrorKind::UnexpectedEnd))?;

    bytes.iter().try_fold(0, |length, &byte| {
        if byte.is_ascii_digit() {
            Ok(length * 10 + (byte - b'0') as usize)
        } else {
            Err(DecodeError::new::<Frame>(
                DecodeErrorKind::MalformedLength {
                    bytes: [bytes[0], bytes[1], bytes[2]],
                },
            ))
        }
    })
}

/// A frame received from the device.
///
/// Decoding never verifies the frame. The recomputed [`checksum`](Self::checksum)
/// and the [`incoming_checksum`](Self::incoming_checksum) are both kept;
/// comparing them is left to [`verify_checksum`](Self::verify_checksum) or
/// [`check`](Self::check).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecodedFrame {
    /// Value of the length field.
    pub length: usize,
    /// Raw message index.
    pub index: u8,
    /// The three bytes following the index.
    pub command: String,
    /// Payload, empty when the length field is 4 or less.
    pub data: String,
    /// Checksum recomputed over everything between the start marker and the trailer.
    pub checksum: u16,
    /// The trailing four bytes as received.
    pub incoming_checksum: [u8; 4],
    /// First byte of the frame, expected to be [`START_MARKER`].
    pub start_marker: u8,
    /// Byte before the trailer, expected to be [`END_MARKER`].
    pub end_marker: u8,
    /// Number of bytes the frame was decoded from.
    pub frame_len: usize,
}

impl DecodedFrame {
    /// The recomputed checksum, formatted as it would be sent.
    pub fn checksum_field(&self, case: HexCase) -> ChecksumField {
        ChecksumField::new(self.checksum, case)
    }

    /// The received checksum trailer as text.
    pub fn incoming_checksum_text(&self) -> String {
        latin1(&self.incoming_checksum)
    }

    /// Compares the received trailer against the recomputed checksum.
    ///
    /// Letter case is ignored.
    pub fn verify_checksum(&self) -> Result<(), DecodeError> {
        let expected = self.checksum_field(HexCase::default());
        if expected.matches(&self.incoming_checksum) {
            Ok(())
        } else {
            Err(DecodeError::new::<Self>(DecodeErrorKind::Checksum {
                found: self.incoming_checksum,
                expected: *expected.as_bytes(),
            }))
        }
    }

    /// Runs the selected integrity checks.
    pub fn check(&self, checks: FrameChecks) -> Result<(), DecodeError> {
        if checks.contains(FrameChecks::MARKERS) {
            if self.start_marker != START_MARKER {
                return Err(DecodeError::new::<Self>(DecodeErrorKind::UnexpectedByte {
                    name: "start marker",
                    value: self.start_marker,
                    expected: &[START_MARKER],
                }));
            }
            if self.end_marker != END_MARKER {
                return Err(DecodeError::new::<Self>(DecodeErrorKind::UnexpectedByte {
                    name: "end marker",
                    value: self.end_marker,
                    expected: &[END_MARKER],
                }));
            }
        }

        if checks.contains(FrameChecks::LENGTH) && self.frame_len != self.length + FRAME_OVERHEAD {
            return Err(DecodeError::new::<Self>(DecodeErrorKind::LengthMismatch {
                expected: self.length + FRAME_OVERHEAD,
                found: self.frame_len,
            }));
        }

        if checks.contains(FrameChecks::CHECKSUM) {
            self.verify_checksum()?;
        }

        Ok(())
    }
}

impl Decode for DecodedFrame {
    /// Decodes one isolated frame, consuming all of `data`.
    fn decode(data: &mut &[u8]) -> Result<Self, DecodeError> {
        let frame = *data;
        let length = read_length_field(frame)?;

        let mut fields = frame;
        let start_marker = u8::decode(&mut fields)?;
        let _ = <[u8; 3]>::decode(&mut fields)?;
        let index = u8::decode(&mut fields)?;
        let command = <[u8; 3]>::decode(&mut fields)?;

        let data_len = length.saturating_sub(COMMAND_OFFSET - 1);
        let payload = fields
            .get(..data_len)
            .ok_or_else(|| DecodeError::new::<Self>(DecodeErrorKind::UnexpectedEnd))?;

        let trailer_start = frame.len() - ChecksumField::SIZE;
        let incoming_checksum = <[u8; 4]>::decode(&mut &frame[trailer_start..])?;

        *data = &[];

        Ok(Self {
            length,
            index,
            command: latin1(&command),
            data: latin1(payload),
            checksum: checksum(&frame[1..trailer_start]),
            incoming_checksum,
            start_marker,
            end_marker: frame[trailer_start - 1],
            frame_len: frame.len(),
        })
    }
}

/// Decodes one frame that has already been cut out of the byte stream.
pub fn decode(frame: &[u8]) -> Result<DecodedFrame, DecodeError> {
    DecodedFrame::decode(&mut &*frame)
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}
