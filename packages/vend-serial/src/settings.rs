//! Terminal settings, persisted as an INI file.
//!
//! ```ini
//! [serial]
//! port_name=COM3
//! baud_rate=9600
//! data_bits=8
//! parity=None
//! stop_bits=One
//! ...
//!
//! [frame]
//! hex_case=lower
//! advance=full-frame
//! checks=checksum,markers
//! ```

use std::{fmt, fs, io, path::Path, str::FromStr, time::Duration};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vend_protocol::{FrameChecks, HexCase, ScanAdvance};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    pub const ALL: [Parity; 5] = [
        Parity::None,
        Parity::Odd,
        Parity::Even,
        Parity::Mark,
        Parity::Space,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Parity::None => "None",
            Parity::Odd => "Odd",
            Parity::Even => "Even",
            Parity::Mark => "Mark",
            Parity::Space => "Space",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum StopBits {
    None,
    #[default]
    One,
    OnePointFive,
    Two,
}

impl StopBits {
    pub const ALL: [StopBits; 4] = [
        StopBits::None,
        StopBits::One,
        StopBits::OnePointFive,
        StopBits::Two,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StopBits::None => "None",
            StopBits::One => "One",
            StopBits::OnePointFive => "OnePointFive",
            StopBits::Two => "Two",
        }
    }
}

macro_rules! named_setting {
    ($ty:ty, $option:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = SettingsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|value| value.name().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| SettingsError::InvalidValue {
                        key: $option,
                        value: s.to_string(),
                    })
            }
        }
    };
}

named_setting!(Parity, "parity");
named_setting!(StopBits, "stop_bits");

/// Baud rates offered by the terminal's port menu.
pub const BAUD_RATES: [u32; 8] = [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

/// How the serial port is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Empty when no port has been chosen yet.
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    #[serde(with = "by_name")]
    pub parity: Parity,
    #[serde(with = "by_name")]
    pub stop_bits: StopBits,
    /// Discard anything already buffered when the port is opened.
    #[serde(with = "by_name")]
    pub clear_on_open: bool,
    /// Clear the terminal log whenever DTR is switched on.
    #[serde(with = "by_name")]
    pub clear_with_dtr: bool,
    /// Assert DTR after opening.
    #[serde(with = "by_name")]
    pub dtr: bool,
    /// Assert RTS after opening.
    #[serde(with = "by_name")]
    pub rts: bool,
    pub timeout_ms: u64,
}

impl SerialSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether switching DTR to `level` should clear the terminal log.
    pub fn clears_log_on_dtr(&self, level: bool) -> bool {
        self.clear_with_dtr && level
    }

    /// Checks the numeric settings for values no port accepts.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.baud_rate == 0 {
            return Err(SettingsError::InvalidValue {
                key: "baud_rate",
                value: self.baud_rate.to_string(),
            });
        }
        if !(5..=9).contains(&self.data_bits) {
            return Err(SettingsError::InvalidValue {
                key: "data_bits",
                value: self.data_bits.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            clear_on_open: false,
            clear_with_dtr: false,
            dtr: true,
            rts: true,
            timeout_ms: 500,
        }
    }
}

/// How frames are written, cut out of captures and checked on receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameOptions {
    #[serde(with = "by_name")]
    pub hex_case: HexCase,
    #[serde(with = "by_name")]
    pub advance: ScanAdvance,
    #[serde(with = "by_name")]
    pub checks: FrameChecks,
}

/// Everything the terminal remembers between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub serial: SerialSettings,
    pub frame: FrameOptions,
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(text) => Self::from_ini_str(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        fs::write(path, self.to_ini_string()?)?;
        Ok(())
    }

    pub fn from_ini_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_ini::from_str(text)?;
        settings.serial.validate()?;
        Ok(settings)
    }

    pub fn to_ini_string(&self) -> Result<String, SettingsError> {
        Ok(serde_ini::to_string(self)?)
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),

    #[error("Could not read settings: {0}")]
    Parse(#[from] serde_ini::de::Error),

    #[error("Could not write settings: {0}")]
    Write(#[from] serde_ini::ser::Error),

    #[error("Invalid value {value:?} for setting {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Stores a value by its display name.
mod by_name {
    use std::{fmt::Display, str::FromStr};

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_machine_port() {
        let settings = SerialSettings::default();

        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.data_bits, 8);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert!(settings.dtr && settings.rts);
        assert!(BAUD_RATES.contains(&settings.baud_rate));
    }

    #[test]
    fn names() {
        assert_eq!("even".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!(StopBits::OnePointFive.to_string(), "OnePointFive");
        assert!(matches!(
            "1.5".parse::<StopBits>(),
            Err(SettingsError::InvalidValue { key: "stop_bits", .. })
        ));
    }

    #[test]
    fn ini_round_trip() {
        let settings = Settings {
            serial: SerialSettings {
                port_name: "COM3".to_string(),
                baud_rate: 19200,
                parity: Parity::Even,
                stop_bits: StopBits::Two,
                clear_on_open: true,
                ..Default::default()
            },
            frame: FrameOptions {
                hex_case: HexCase::Upper,
                advance: ScanAdvance::LengthField,
                checks: FrameChecks::CHECKSUM | FrameChecks::MARKERS,
            },
        };

        let text = settings.to_ini_string().unwrap();
        assert!(text.contains("parity=Even"));
        assert!(text.contains("checks=checksum,markers"));
        assert_eq!(Settings::from_ini_str(&text).unwrap(), settings);
    }

    #[test]
    fn flags_are_words() {
        let text = Settings::default().to_ini_string().unwrap();
        assert!(text.contains("dtr=true"));
        assert!(text.contains("clear_on_open=false"));

        let settings =
            Settings::from_ini_str("[serial]\ndtr=false\nrts=false\nclear_with_dtr=true\n").unwrap();
        assert!(!settings.serial.dtr);
        assert!(!settings.serial.rts);
        assert!(settings.serial.clear_with_dtr);

        assert!(matches!(
            Settings::from_ini_str("[serial]\ndtr=maybe\n"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn dtr_clears_log_when_enabled() {
        let mut settings = SerialSettings::default();
        assert!(!settings.clears_log_on_dtr(true));

        settings.clear_with_dtr = true;
        assert!(settings.clears_log_on_dtr(true));
        assert!(!settings.clears_log_on_dtr(false));
    }

    #[test]
    fn missing_keys_use_defaults() {
        let settings = Settings::from_ini_str("[serial]\nport_name=COM7\n").unwrap();

        assert_eq!(settings.serial.port_name, "COM7");
        assert_eq!(settings.serial.baud_rate, 9600);
        assert_eq!(settings.frame, FrameOptions::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Settings::from_ini_str("[serial]\nparity=Sometimes\n"),
            Err(SettingsError::Parse(_))
        ));
        assert!(matches!(
            Settings::from_ini_str("[serial]\ndata_bits=12\n"),
            Err(SettingsError::InvalidValue { key: "data_bits", .. })
        ));
    }

    #[test]
    fn load_and_save() {
        let path = std::env::temp_dir().join(format!(
            "vend-serial-settings-{}.ini",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);

        assert_eq!(Settings::load(&path).unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.serial.port_name = "/dev/ttyUSB0".to_string();
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);

        fs::remove_file(&path).unwrap();
    }
}
