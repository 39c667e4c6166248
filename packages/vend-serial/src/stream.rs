//! A [`Connection`] over any async byte stream.
//!
//! [`SerialConnection`](crate::serial::SerialConnection) is this type over a
//! serial port; tests run it over an in-memory pipe.

use std::time::Duration;

use log::{trace, warn};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    select,
    time::sleep,
};
use vend_protocol::{decode, DecodeError, DecodedFrame, EncodeError, Frame, FrameBuffer};

use crate::{settings::FrameOptions, ComState, Connection, MachineState};

/// An open connection to a vending machine over a byte stream.
#[derive(Debug)]
pub struct StreamConnection<S> {
    name: String,
    stream: S,
    incoming: FrameBuffer,
    options: FrameOptions,
    com_state: ComState,
    machine_state: MachineState,
}

impl<S: AsyncRead + AsyncWrite + Unpin> StreamConnection<S> {
    pub fn new(name: impl Into<String>, stream: S, options: FrameOptions) -> Self {
        Self {
            name: name.into(),
            stream,
            incoming: FrameBuffer::new(),
            options,
            com_state: ComState::Idle,
            machine_state: MachineState::PowerOn,
        }
    }

    /// Name of the port or pipe this connection talks over.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &FrameOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: FrameOptions) {
        self.options = options;
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Number of received bytes not yet part of a complete frame.
    pub fn buffered(&self) -> usize {
        self.incoming.len()
    }

    /// Drops any partially received frame and returns the line to idle.
    pub fn clear_incoming(&mut self) {
        self.incoming.clear();
        if self.com_state.is_busy() {
            self.com_state = ComState::Idle;
        }
    }

    /// Shuts the stream down. Later sends fail with [`SerialError::Closed`].
    pub async fn close(&mut self) -> Result<(), SerialError> {
        self.machine_state = MachineState::PowerOff;
        self.com_state = ComState::Idle;
        self.incoming.clear();
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn write_frame(&mut self, encoded: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(encoded).await?;
        self.stream.flush().await
    }

    /// Reads until a complete frame passing the configured checks is buffered.
    async fn receive_frame(&mut self) -> Result<DecodedFrame, SerialError> {
        let mut chunk = [0u8; 256];

        loop {
            match self.incoming.next_frame() {
                Ok(Some(raw)) => {
                    trace!("received frame: {:02x?}", &raw[..]);

                    let frame = decode(&raw)?;
                    match frame.check(self.options.checks) {
                        Ok(()) => return Ok(frame),
                        Err(e) => warn!("Skipping frame that failed checks: {}", e),
                    }
                }
                Ok(None) => {
                    let read = self.stream.read(&mut chunk).await?;
                    if read == 0 {
                        return Err(SerialError::Closed);
                    }
                    trace!("read {} bytes: {:02x?}", read, &chunk[..read]);
                    self.incoming.extend(&chunk[..read]);
                }
                Err(e) => warn!("Discarding malformed frame: {}", e),
            }
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection for StreamConnection<S> {
    type Error = SerialError;

    fn com_state(&self) -> ComState {
        self.com_state
    }

    fn machine_state(&self) -> MachineState {
        self.machine_state
    }

    async fn send(&mut self, frame: &Frame) -> Result<(), SerialError> {
        if !self.machine_state.is_powered() {
            return Err(SerialError::Closed);
        }

        let encoded = frame.to_bytes(self.options.hex_case);
        trace!("sent frame: {:02x?}", encoded);

        self.com_state = ComState::Transmit;
        if let Err(e) = self.write_frame(&encoded).await {
            self.com_state = ComState::BusyOnTransmit;
            return Err(SerialError::IoError(e));
        }

        self.com_state = ComState::Idle;
        self.machine_state = MachineState::Busy;
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<DecodedFrame, SerialError> {
        if !self.machine_state.is_powered() {
            return Err(SerialError::Closed);
        }

        self.com_state = ComState::Receive;

        // Return an error if no frame is received within the timeout
        let result = select! {
            result = self.receive_frame() => result,
            _ = sleep(timeout) => Err(SerialError::Timeout),
        };

        self.com_state = match &result {
            Err(_) if !self.incoming.is_empty() => ComState::BusyOnReceive,
            _ => ComState::Idle,
        };
        if result.is_ok() {
            self.machine_state = MachineState::PowerOn;
        }

        result
    }
}

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Frame decoding error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("Frame encoding error: {0}")]
    EncodeError(#[from] EncodeError),

    #[error("Frame timeout")]
    Timeout,

    #[error("Connection is closed")]
    Closed,

    #[cfg(feature = "serial")]
    #[error("Serialport Error")]
    SerialportError(#[from] tokio_serial::Error),

    #[error("No serial ports found")]
    NoPorts,

    #[error("Serial ports cannot be opened with {setting} set to {value}")]
    UnsupportedSetting {
        setting: &'static str,
        value: String,
    },
}
