//! Crate for talking to vending machine controllers over a serial line.
//!
//! Frames are built and parsed by [`vend_protocol`], re-exported here as
//! [`protocol`]. This crate moves them over a byte stream, tracks the state of
//! the line, picks serial ports and keeps the terminal settings.

pub use vend_protocol as protocol;

use std::{future::Future, time::Duration};

use log::{error, warn};
use vend_protocol::{DecodeError, DecodedFrame, EncodeError, Frame};

pub mod commands;
pub mod settings;
pub mod stream;
pub mod terminal;

#[cfg(feature = "serial")]
pub mod ports;
#[cfg(feature = "serial")]
pub mod serial;

use crate::commands::Command;

/// Represents an open connection to a vending machine.
#[allow(async_fn_in_trait)]
pub trait Connection {
    type Error: std::error::Error + From<DecodeError> + From<EncodeError>;

    /// What the line is currently doing.
    fn com_state(&self) -> ComState;

    /// Whether the machine is believed to be powered and free.
    fn machine_state(&self) -> MachineState;

    /// Sends a frame.
    fn send(&mut self, frame: &Frame) -> impl Future<Output = Result<(), Self::Error>>;

    /// Receives the next frame that passes the connection's checks.
    fn recv(&mut self, timeout: Duration) -> impl Future<Output = Result<DecodedFrame, Self::Error>>;

    /// Executes a [`Command`].
    fn execute_command<C: Command>(
        &mut self,
        command: C,
    ) -> impl Future<Output = Result<C::Output, Self::Error>> {
        command.execute(self)
    }

    /// Sends a frame and waits for any frame in response.
    ///
    /// This function will retry the handshake `retries` times
    /// before giving up and erroring with the error thrown on the last retry.
    ///
    /// # Note
    ///
    /// This function will fail immediately if the frame fails to send.
    async fn handshake(
        &mut self,
        frame: &Frame,
        timeout: Duration,
        retries: usize,
    ) -> Result<DecodedFrame, Self::Error> {
        let mut attempt = 0;

        loop {
            self.send(frame).await?;
            match self.recv(timeout).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < retries => {
                    warn!(
                        "Handshake for command {:?} failed: {:?}. Retrying...",
                        frame.command(),
                        e
                    );
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Handshake failed after {} retries with error: {:?}",
                        retries, e
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Activity on the serial line.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum ComState {
    #[default]
    Idle,
    /// A frame is being written.
    Transmit,
    /// Waiting for a frame to arrive.
    Receive,
    /// A receive gave up with part of a frame still buffered.
    BusyOnReceive,
    /// A write failed part way through a frame.
    BusyOnTransmit,
}

impl ComState {
    /// Returns whether the line is in the middle of a broken exchange.
    pub fn is_busy(&self) -> bool {
        matches!(self, ComState::BusyOnReceive | ComState::BusyOnTransmit)
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum MachineState {
    #[default]
    PowerOff,
    PowerOn,
    /// A request is outstanding.
    Busy,
}

impl MachineState {
    pub fn is_powered(&self) -> bool {
        !matches!(self, MachineState::PowerOff)
    }
}
