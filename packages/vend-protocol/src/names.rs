//! Textual names of the codec options, as used in settings files.

use core::{fmt, str::FromStr};

use alloc::string::{String, ToString};
use thiserror::Error;

use crate::{checks::FrameChecks, checksum::HexCase, scan::ScanAdvance};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {option} {input:?}, expected one of: {expected:?}.")]
pub struct UnknownOption {
    pub option: &'static str,
    pub input: String,
    pub expected: &'static [&'static str],
}

fn lookup<T: Copy>(
    option: &'static str,
    input: &str,
    table: &'static [(&'static str, T)],
    names: &'static [&'static str],
) -> Result<T, UnknownOption> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(input.trim()))
        .map(|&(_, value)| value)
        .ok_or_else(|| UnknownOption {
            option,
            input: input.to_string(),
            expected: names,
        })
}

const HEX_CASES: &[(&str, HexCase)] = &[("lower", HexCase::Lower), ("upper", HexCase::Upper)];
const HEX_CASE_NAMES: &[&str] = &["lower", "upper"];

impl HexCase {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
        }
    }
}

impl fmt::Display for HexCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HexCase {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup("hex case", s, HEX_CASES, HEX_CASE_NAMES)
    }
}

const ADVANCES: &[(&str, ScanAdvance)] = &[
    ("full-frame", ScanAdvance::FullFrame),
    ("length-field", ScanAdvance::LengthField),
    ("full-frame-plus-one", ScanAdvance::FullFramePlusOne),
];
const ADVANCE_NAMES: &[&str] = &["full-frame", "length-field", "full-frame-plus-one"];

impl ScanAdvance {
    pub const fn name(self) -> &'static str {
        match self {
            Self::FullFrame => "full-frame",
            Self::LengthField => "length-field",
            Self::FullFramePlusOne => "full-frame-plus-one",
        }
    }
}

impl fmt::Display for ScanAdvance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScanAdvance {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup("scan advance", s, ADVANCES, ADVANCE_NAMES)
    }
}

const CHECKS: &[(&str, FrameChecks)] = &[
    ("checksum", FrameChecks::CHECKSUM),
    ("length", FrameChecks::LENGTH),
    ("markers", FrameChecks::MARKERS),
];
const CHECK_NAMES: &[&str] = &["checksum", "length", "markers"];

/// Comma separated check names, empty for no checks.
impl fmt::Display for FrameChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = CHECKS
            .iter()
            .filter(|(_, check)| self.contains(*check))
            .map(|(name, _)| *name);

        if let Some(first) = names.next() {
            f.write_str(first)?;
            for name in names {
                write!(f, ",{name}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for FrameChecks {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|name| !name.trim().is_empty())
            .try_fold(FrameChecks::empty(), |checks, name| {
                Ok(checks | lookup("frame check", name, CHECKS, CHECK_NAMES)?)
            })
    }
}
