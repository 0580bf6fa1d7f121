//! Controller-side command encoding and transaction handling.
//!
//! A command goes out as `code, !code, body..., 0`. Commands without a body send a
//! single `0` trigger byte in place of the body. The trailing `0` is the ack-request
//! byte: it clocks the final ACK/NACK back to the controller, so the last received
//! byte of every exchange is the verdict.

use crate::colors::Pixel;
use crate::command::CommandCode;
use crate::protocol::{
    ACK, COMMAND_ECHO, COMPLEMENT_ECHO, CommandEngine, NACK_HEAD, NACK_TAIL, NACK_UNK, TIMEOUT,
};
use heapless::Vec;

/// Longest encoded command (SetPixel: code, complement, five body bytes, ack request).
pub const MAX_FRAME_LEN: usize = 8;

/// SetPixel body: x, y, r, g, b.
const LONGEST_BODY: usize = 5;

// Frame pushes below rely on this bound and discard the capacity error.
const _: () = assert!(MAX_FRAME_LEN >= 2 + LONGEST_BODY + 1);

/// Bytes of one command transaction.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// A command the controller can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Clear,
    Fill(Pixel),
    Update,
    SetPixel { x: u8, y: u8, color: Pixel },
    SmallEmpty,
}

impl HostCommand {
    /// The command code sent first on the wire.
    pub fn code(&self) -> CommandCode {
        match self {
            HostCommand::Clear => CommandCode::Clear,
            HostCommand::Fill(_) => CommandCode::Fill,
            HostCommand::Update => CommandCode::Update,
            HostCommand::SetPixel { .. } => CommandCode::SetPixel,
            HostCommand::SmallEmpty => CommandCode::SmallEmpty,
        }
    }

    /// Body bytes after the complement, excluding the ack request.
    fn body(&self) -> Frame {
        let mut body = Frame::new();
        // Capacity covers the largest body
        let _ = match self {
            HostCommand::Fill(color) => {
                body.extend_from_slice(&[color.red, color.green, color.blue])
            }
            HostCommand::SetPixel { x, y, color } => {
                body.extend_from_slice(&[*x, *y, color.red, color.green, color.blue])
            }
            // Empty commands still need one byte to trigger the handler
            HostCommand::Clear | HostCommand::Update | HostCommand::SmallEmpty => {
                body.extend_from_slice(&[0])
            }
        };
        body
    }

    /// Encodes the complete transaction.
    pub fn encode(&self) -> Frame {
        let code = self.code();
        let mut frame = Frame::new();
        let _ = frame.push(code.as_byte());
        let _ = frame.push(code.complement());
        let _ = frame.extend_from_slice(&self.body());
        let _ = frame.push(0);
        frame
    }

    /// Responses a healthy peripheral produces for the code, complement and body
    /// bytes, in order. The last one is always [`ACK`].
    pub fn expected_replies(&self) -> Frame {
        let body_len = self.body().len();
        let mut replies = Frame::new();
        let _ = replies.push(COMMAND_ECHO);
        let _ = replies.push(COMPLEMENT_ECHO);
        for position in 0..body_len - 1 {
            let _ = replies.push(position as u8);
        }
        let _ = replies.push(ACK);
        replies
    }
}

/// Meaning of a response byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Progress echo: 1 for the code, 2 for the complement, or a body position.
    Echo(u8),
    Ack,
    NackHead,
    NackTail,
    NackUnknown,
    Timeout,
}

impl From<u8> for Reply {
    fn from(byte: u8) -> Self {
        match byte {
            ACK => Reply::Ack,
            NACK_HEAD => Reply::NackHead,
            NACK_TAIL => Reply::NackTail,
            NACK_UNK => Reply::NackUnknown,
            TIMEOUT => Reply::Timeout,
            other => Reply::Echo(other),
        }
    }
}

impl core::fmt::Display for Reply {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Reply::Echo(byte) => write!(f, "echo {:#04x}", byte),
            Reply::Ack => write!(f, "ACK"),
            Reply::NackHead => write!(f, "NACK (bad complement)"),
            Reply::NackTail => write!(f, "NACK (command rejected)"),
            Reply::NackUnknown => write!(f, "NACK (illegitimate state)"),
            Reply::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

/// Trait for abstracting the controller's full-duplex link.
pub trait MasterLink {
    type Error;

    /// Clocks `tx` out while filling `rx` with the bytes clocked in.
    ///
    /// `tx` and `rx` have the same length.
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error>;
}

/// Bytes sent and received for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub tx: Frame,
    pub rx: Frame,
}

impl Exchange {
    /// The verdict: the final byte received.
    pub fn reply(&self) -> Reply {
        self.rx.last().map_or(Reply::NackUnknown, |&byte| Reply::from(byte))
    }
}

/// Errors that can occur while sending a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError<E> {
    /// The link itself failed.
    Link(E),
    /// The peripheral's responses differed from the expected echo/ACK sequence.
    Rejected {
        /// First response that differed from the expected one, decoded
        reply: Reply,
        /// Everything that was exchanged
        exchange: Exchange,
    },
}

impl<E: core::fmt::Display> core::fmt::Display for ControllerError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ControllerError::Link(err) => write!(f, "link error: {}", err),
            ControllerError::Rejected { reply, .. } => {
                write!(f, "command rejected: unexpected {}", reply)
            }
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug + core::fmt::Display> std::error::Error for ControllerError<E> {}

/// Sends commands over a [`MasterLink`], one transaction per command.
pub struct Controller<L: MasterLink> {
    link: L,
}

impl<L: MasterLink> Controller<L> {
    /// Creates a controller that owns `link`.
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// Sends one command and checks every response against
    /// [`HostCommand::expected_replies`].
    ///
    /// The first received byte belongs to the previous transaction and is not checked.
    ///
    /// # Errors
    /// * `Link` - The transfer failed; nothing is known about the peripheral state
    /// * `Rejected` - The peripheral NACKed, timed out or echoed out of sequence
    pub fn send(&mut self, command: &HostCommand) -> Result<Exchange, ControllerError<L::Error>> {
        let tx = command.encode();
        let mut rx_buf = [0u8; MAX_FRAME_LEN];
        let rx_buf = &mut rx_buf[..tx.len()];
        self.link
            .transfer(&tx, rx_buf)
            .map_err(ControllerError::Link)?;

        let mut rx = Frame::new();
        let _ = rx.extend_from_slice(rx_buf);
        let exchange = Exchange { tx, rx };

        let expected = command.expected_replies();
        let mismatch = exchange
            .rx
            .iter()
            .skip(1)
            .zip(expected.iter())
            .find(|(got, want)| got != want)
            .map(|(&got, _)| Reply::from(got));

        match mismatch {
            None => Ok(exchange),
            Some(reply) => Err(ControllerError::Rejected { reply, exchange }),
        }
    }

    /// Sends a command, resending it from the code byte after a rejection.
    ///
    /// Makes at most `attempts` tries (at least one). Link errors are not retried.
    pub fn send_retrying(
        &mut self,
        command: &HostCommand,
        attempts: usize,
    ) -> Result<Exchange, ControllerError<L::Error>> {
        let mut remaining = attempts.max(1);
        loop {
            remaining -= 1;
            match self.send(command) {
                Err(ControllerError::Rejected { .. }) if remaining > 0 => continue,
                result => return result,
            }
        }
    }

    /// The underlying link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutable access to the underlying link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consumes the controller, returning the link.
    pub fn into_inner(self) -> L {
        self.link
    }
}

/// In-process link to a simulated peripheral.
///
/// Models SPI shifting: the byte received for `tx[i]` is the response the peripheral
/// had queued before `tx[i]` arrived.
#[derive(Debug, Clone, Default)]
pub struct Loopback<const W: usize, const H: usize> {
    engine: CommandEngine<W, H>,
    flushes: usize,
}

impl<const W: usize, const H: usize> Loopback<W, H> {
    /// Creates a simulated peripheral with a blank matrix.
    pub fn new() -> Self {
        Self {
            engine: CommandEngine::new(),
            flushes: 0,
        }
    }

    /// The simulated peripheral's protocol engine.
    pub fn engine(&self) -> &CommandEngine<W, H> {
        &self.engine
    }

    /// Simulates the link going quiet past the inter-byte timeout.
    pub fn stall(&mut self) {
        self.engine.reset_on_timeout();
    }

    /// Number of times the simulated LED string has been written.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl<const W: usize, const H: usize> MasterLink for Loopback<W, H> {
    type Error = core::convert::Infallible;

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error> {
        for (out, &byte) in rx.iter_mut().zip(tx) {
            *out = self.engine.response();
            self.engine.accept(byte);
            if self.engine.take_flush_request() {
                self.flushes += 1;
            }
        }
        Ok(())
    }
}
