//! Multi-step exchanges built on top of a [`Connection`].

use std::{future::Future, time::Duration};

use log::{debug, warn};
use tokio::time::Instant;
use vend_protocol::{DecodedFrame, Frame};

use crate::Connection;

pub trait Command {
    type Output;

    fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> impl Future<Output = Result<Self::Output, C::Error>>;
}

/// Sends a frame and waits for the reply carrying the same message index.
///
/// Frames with another index that arrive in the meantime are logged and
/// dropped. Each attempt gets the full `timeout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub frame: Frame,
    pub timeout: Duration,
    pub retries: usize,
}

impl Request {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            timeout: Duration::from_millis(500),
            retries: 2,
        }
    }

    async fn await_reply<C: Connection + ?Sized>(
        &self,
        connection: &mut C,
    ) -> Result<DecodedFrame, C::Error> {
        let deadline = Instant::now() + self.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let reply = connection.recv(remaining).await?;

            if reply.index == self.frame.index() {
                return Ok(reply);
            }
            debug!(
                "Dropping reply with index {} while waiting for {}",
                reply.index,
                self.frame.index()
            );
        }
    }
}

impl Command for Request {
    type Output = DecodedFrame;

    async fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, C::Error> {
        let mut attempt = 0;

        loop {
            connection.send(&self.frame).await?;
            match self.await_reply(connection).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.retries => {
                    warn!(
                        "No reply to index {}: {}. Retrying...",
                        self.frame.index(),
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Hands out message indices for consecutive requests.
///
/// Starts at the terminal's default index and wraps around after `0xFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSequence {
    next: u8,
}

impl IndexSequence {
    pub const DEFAULT_START: u8 = 32;

    pub const fn starting_at(index: u8) -> Self {
        Self { next: index }
    }

    /// Returns the next index and advances the sequence.
    pub fn advance(&mut self) -> u8 {
        let index = self.next;
        self.next = self.next.wrapping_add(1);
        index
    }

    /// Builds a [`Request`] for `command` and `data` using the next index.
    pub fn request(
        &mut self,
        command: &str,
        data: &str,
    ) -> Result<Request, vend_protocol::EncodeError> {
        let frame = Frame::new(self.advance(), command, data)?;
        Ok(Request::new(frame))
    }
}

impl Default for IndexSequence {
    fn default() -> Self {
        Self::starting_at(Self::DEFAULT_START)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_wraps() {
        let mut sequence = IndexSequence::starting_at(0xFE);

        assert_eq!(sequence.advance(), 0xFE);
        assert_eq!(sequence.advance(), 0xFF);
        assert_eq!(sequence.advance(), 0x00);
    }

    #[test]
    fn sequence_builds_requests() {
        let mut sequence = IndexSequence::default();

        let first = sequence.request("107", "510").unwrap();
        let second = sequence.request("107", "").unwrap();

        assert_eq!(first.frame.index(), 32);
        assert_eq!(first.frame.data(), "510");
        assert_eq!(second.frame.index(), 33);
        assert_eq!(second.retries, 2);
    }
}
