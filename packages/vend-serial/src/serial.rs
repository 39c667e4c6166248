//! Implements opening and controlling the serial port a vending machine is wired to.

use std::fmt;

use log::{debug, info};
use tokio_serial::{ClearBuffer, SerialPort, SerialStream};

use crate::{
    settings::{FrameOptions, Parity, SerialSettings, StopBits},
    stream::StreamConnection,
};

pub use crate::stream::SerialError;

/// An open serial connection to a vending machine.
pub type SerialConnection = StreamConnection<SerialStream>;

fn data_bits(bits: u8) -> Result<tokio_serial::DataBits, SerialError> {
    Ok(match bits {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        8 => tokio_serial::DataBits::Eight,
        _ => {
            return Err(SerialError::UnsupportedSetting {
                setting: "data_bits",
                value: bits.to_string(),
            })
        }
    })
}

fn parity(parity: Parity) -> Result<tokio_serial::Parity, SerialError> {
    match parity {
        Parity::None => Ok(tokio_serial::Parity::None),
        Parity::Odd => Ok(tokio_serial::Parity::Odd),
        Parity::Even => Ok(tokio_serial::Parity::Even),
        Parity::Mark | Parity::Space => Err(SerialError::UnsupportedSetting {
            setting: "parity",
            value: parity.to_string(),
        }),
    }
}

fn stop_bits(stop_bits: StopBits) -> Result<tokio_serial::StopBits, SerialError> {
    match stop_bits {
        StopBits::One => Ok(tokio_serial::StopBits::One),
        StopBits::Two => Ok(tokio_serial::StopBits::Two),
        StopBits::None | StopBits::OnePointFive => Err(SerialError::UnsupportedSetting {
            setting: "stop_bits",
            value: stop_bits.to_string(),
        }),
    }
}

impl StreamConnection<SerialStream> {
    /// Opens `port_name` with the given line settings and asserts DTR and RTS
    /// as configured.
    pub fn open(
        port_name: &str,
        settings: &SerialSettings,
        options: FrameOptions,
    ) -> Result<Self, SerialError> {
        let builder = tokio_serial::new(port_name, settings.baud_rate)
            .data_bits(data_bits(settings.data_bits)?)
            .parity(parity(settings.parity)?)
            .stop_bits(stop_bits(settings.stop_bits)?)
            .timeout(settings.timeout());

        let mut stream = SerialStream::open(&builder)?;
        stream.write_data_terminal_ready(settings.dtr)?;
        stream.write_request_to_send(settings.rts)?;

        if settings.clear_on_open {
            debug!("Clearing buffers of {}", port_name);
            stream.clear(ClearBuffer::All)?;
        }

        info!(
            "Opened {} at {} baud ({}{}{})",
            port_name,
            settings.baud_rate,
            settings.data_bits,
            settings.parity.name().chars().next().unwrap_or('N'),
            match settings.stop_bits {
                StopBits::Two => "2",
                _ => "1",
            }
        );

        Ok(Self::new(port_name, stream, options))
    }

    /// Reads the modem status lines.
    pub fn pin_state(&mut self) -> Result<PinState, SerialError> {
        let port = self.get_mut();

        Ok(PinState {
            carrier_detect: port.read_carrier_detect()?,
            clear_to_send: port.read_clear_to_send()?,
            data_set_ready: port.read_data_set_ready()?,
        })
    }

    pub fn set_dtr(&mut self, level: bool) -> Result<(), SerialError> {
        debug!("DTR {}", if level { "on" } else { "off" });
        self.get_mut().write_data_terminal_ready(level)?;
        Ok(())
    }

    pub fn set_rts(&mut self, level: bool) -> Result<(), SerialError> {
        debug!("RTS {}", if level { "on" } else { "off" });
        self.get_mut().write_request_to_send(level)?;
        Ok(())
    }
}

/// Levels of the modem status lines driven by the machine.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct PinState {
    pub carrier_detect: bool,
    pub clear_to_send: bool,
    pub data_set_ready: bool,
}

impl PinState {
    fn pins(&self) -> [(&'static str, bool); 3] {
        [
            ("CD", self.carrier_detect),
            ("CTS", self.clear_to_send),
            ("DSR", self.data_set_ready),
        ]
    }

    /// Lists the pins whose level differs from `previous`, with their new level.
    pub fn changes(&self, previous: &PinState) -> Vec<(&'static str, bool)> {
        self.pins()
            .into_iter()
            .zip(previous.pins())
            .filter(|(now, before)| now.1 != before.1)
            .map(|(now, _)| now)
            .collect()
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, level)) in self.pins().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {}", name, if level { "on" } else { "off" })?;
        }
        Ok(())
    }
}
