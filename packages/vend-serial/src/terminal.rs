//! Helpers for the interactive terminal: hex views of frames, decoding of
//! captured traffic and coloured log categories.

use std::fmt;

use log::{log, Level};
use thiserror::Error;
use vend_protocol::{scan_with, DecodeError, DecodedFrame};

use crate::settings::FrameOptions;

/// Log target used by [`log_line`].
pub const LOG_TARGET: &str = "vend_serial::terminal";

/// Formats bytes as upper-case hex pairs, each followed by a space.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut dump = String::with_capacity(bytes.len() * 3);
    for byte in bytes {
        dump.push_str(&format!("{:02X} ", byte));
    }
    dump
}

/// Formats bytes as lower-case hex without separators.
pub fn compact_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parses hex text as written by [`hex_dump`] or [`compact_hex`].
///
/// Whitespace anywhere in the text is ignored.
pub fn parse_hex_dump(text: &str) -> Result<Vec<u8>, TerminalError> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits).map_err(|source| TerminalError::InvalidHex {
        text: text.to_string(),
        source,
    })
}

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("Not properly formatted hex string: {text}")]
    InvalidHex {
        text: String,
        #[source]
        source: hex::FromHexError,
    },
}

/// Category of a terminal log line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LogKind {
    Incoming,
    Outgoing,
    Normal,
    Warning,
    Error,
}

impl LogKind {
    pub fn level(&self) -> Level {
        match self {
            LogKind::Incoming | LogKind::Outgoing | LogKind::Normal => Level::Info,
            LogKind::Warning => Level::Warn,
            LogKind::Error => Level::Error,
        }
    }

    /// Short marker shown in front of the message.
    pub fn prefix(&self) -> &'static str {
        match self {
            LogKind::Incoming => "<<",
            LogKind::Outgoing => ">>",
            LogKind::Normal => "--",
            LogKind::Warning => "!!",
            LogKind::Error => "**",
        }
    }
}

/// Writes one terminal line through the `log` facade.
pub fn log_line(kind: LogKind, message: &str) {
    log!(target: LOG_TARGET, kind.level(), "{} {}", kind.prefix(), message);
}

/// One frame found in a captured dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// The frame's bytes as a [`hex_dump`].
    pub raw: String,
    pub frame: DecodedFrame,
    /// Recomputed checksum field, in the configured letter case.
    pub checksum: String,
    /// Whether the received trailer matches the recomputed checksum.
    pub verified: bool,
}

impl FrameReport {
    fn new(bytes: &[u8], frame: DecodedFrame, options: &FrameOptions) -> Self {
        Self {
            raw: hex_dump(bytes),
            checksum: frame.checksum_field(options.hex_case).to_string(),
            verified: frame.verify_checksum().is_ok(),
            frame,
        }
    }

    /// Logs the report the way the terminal's processed output shows it.
    pub fn log(&self) {
        log_line(LogKind::Incoming, &format!("Processing: {}", self.raw));
        for line in self.to_string().lines() {
            log_line(LogKind::Outgoing, line);
        }
        if !self.verified {
            log_line(
                LogKind::Warning,
                &format!(
                    "Received checksum {:?} does not match",
                    self.frame.incoming_checksum_text()
                ),
            );
        }
        log_line(LogKind::Normal, "------------------------------------");
    }
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data size: {:03}", self.frame.length)?;
        writeln!(f, "Index: {}", self.frame.index)?;
        writeln!(f, "Command: {}", self.frame.command)?;
        writeln!(f, "Data: {}", self.frame.data)?;
        write!(f, "CRC: {}", self.checksum)
    }
}

/// Frames decoded from a dump, and the error that ended decoding early, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedDump {
    pub reports: Vec<FrameReport>,
    pub error: Option<DecodeError>,
}

/// Decodes every frame in a hex dump of captured traffic.
pub fn process_dump(text: &str, options: &FrameOptions) -> Result<ProcessedDump, TerminalError> {
    let bytes = parse_hex_dump(text)?;
    let mut scanner = scan_with(&bytes, options.advance);

    let mut reports = Vec::new();
    let mut error = None;
    while let Some(result) = scanner.next_with_bytes() {
        match result {
            Ok((raw, frame)) => reports.push(FrameReport::new(raw, frame, options)),
            Err(e) => error = Some(e),
        }
    }

    Ok(ProcessedDump { reports, error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vend_protocol::{encode, DecodeErrorKind, HexCase, ScanAdvance};

    #[test]
    fn dump_formats() {
        let frame = encode("32", "107", "1").unwrap();

        assert_eq!(
            hex_dump(&frame),
            "02 30 30 35 20 31 30 37 31 03 34 30 39 31 "
        );
        assert_eq!(compact_hex(&frame[..4]), "02303035");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn parses_dumps() {
        let frame = encode("32", "107", "1").unwrap();

        assert_eq!(parse_hex_dump(&hex_dump(&frame)).unwrap(), frame);
        assert_eq!(parse_hex_dump(&compact_hex(&frame)).unwrap(), frame);
        assert_eq!(parse_hex_dump("02 3\n0\t30").unwrap(), [0x02, 0x30, 0x30]);
    }

    #[test]
    fn rejects_bad_dumps() {
        assert!(matches!(
            parse_hex_dump("02 3"),
            Err(TerminalError::InvalidHex {
                source: hex::FromHexError::OddLength,
                ..
            })
        ));
        assert!(parse_hex_dump("zz").is_err());
    }

    #[test]
    fn processes_capture() {
        let mut capture = encode("32", "107", "1").unwrap();
        capture.extend(encode("1", "200", "ABCDEF").unwrap());
        let options = FrameOptions {
            hex_case: HexCase::Upper,
            ..Default::default()
        };

        let processed = process_dump(&hex_dump(&capture), &options).unwrap();

        assert_eq!(processed.error, None);
        assert_eq!(processed.reports.len(), 2);

        let report = &processed.reports[0];
        assert_eq!(report.raw, hex_dump(&capture[..14]));
        assert!(report.verified);
        assert_eq!(
            report.to_string(),
            "Data size: 005\nIndex: 32\nCommand: 107\nData: 1\nCRC: 4091"
        );
        assert_eq!(processed.reports[1].checksum, "70D ");
    }

    #[test]
    fn keeps_frames_before_error() {
        let mut capture = encode("1", "100", "").unwrap();
        capture.extend(&encode("2", "107", "1").unwrap()[..8]);

        let processed = process_dump(&compact_hex(&capture), &FrameOptions::default()).unwrap();

        assert_eq!(processed.reports.len(), 1);
        assert_eq!(
            processed.error.map(|e| e.kind()),
            Some(DecodeErrorKind::UnexpectedEnd)
        );
    }

    #[test]
    fn honours_scan_advance() {
        let mut capture = Vec::new();
        for index in ["5", "6", "7"] {
            capture.extend(encode(index, "107", "1").unwrap());
        }
        let options = FrameOptions {
            advance: ScanAdvance::FullFramePlusOne,
            ..Default::default()
        };

        let processed = process_dump(&compact_hex(&capture), &options).unwrap();
        let indices: Vec<u8> = processed.reports.iter().map(|r| r.frame.index).collect();
        assert_eq!(indices, [5, 7]);
    }

    #[test]
    fn log_levels() {
        assert_eq!(LogKind::Incoming.level(), Level::Info);
        assert_eq!(LogKind::Warning.level(), Level::Warn);
        assert_eq!(LogKind::Error.level(), Level::Error);
    }
}
