//! Byte-level framing state machine.
//!
//! [`CommandEngine`] is fed one inbound byte per link transaction and returns the
//! response byte to queue for the next transaction. It knows nothing about time or
//! hardware: timeouts are imposed from outside through
//! [`CommandEngine::reset_on_timeout`], and flushes are handed out through
//! [`CommandEngine::take_flush_request`].

use crate::command::{CommandContext, FlushRequest, HandlerResult, complement};
use crate::framebuffer::Framebuffer;

/// Command applied successfully.
pub const ACK: u8 = 0x55;
/// Complement byte did not match the command byte.
pub const NACK_HEAD: u8 = 0xAA;
/// Unknown command, or the handler rejected the body.
pub const NACK_TAIL: u8 = 0xAB;
/// Illegitimate state reached.
pub const NACK_UNK: u8 = 0xAC;
/// No byte for longer than the inter-byte timeout.
pub const TIMEOUT: u8 = 0x44;

/// Response to an accepted command byte.
pub const COMMAND_ECHO: u8 = 0x01;
/// Response to a matching complement byte.
pub const COMPLEMENT_ECHO: u8 = 0x02;
/// Response register contents before the first byte is serviced.
pub const IDLE_RESPONSE: u8 = 0xFF;

/// Where the machine is within a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolState {
    /// The next byte is a command code.
    AwaitingCommand,
    /// Command code received; the next byte must be its complement.
    GotCommandByte,
    /// Framing validated; bytes are routed to the command handler.
    GotComplementByte,
    /// Command finished; the ACK/NACK is on the line for one more transaction.
    AwaitingAck,
}

/// Framing state machine plus the framebuffer it drives.
///
/// # Type Parameters
/// * `W` - Matrix width
/// * `H` - Matrix height
#[derive(Debug, Clone)]
pub struct CommandEngine<const W: usize, const H: usize> {
    framebuffer: Framebuffer<W, H>,
    state: ProtocolState,
    command: u8,
    position: u8,
    context: Option<CommandContext>,
    flush: FlushRequest,
    response: u8,
}

impl<const W: usize, const H: usize> CommandEngine<W, H> {
    /// Creates an engine waiting for a command, with a dark framebuffer.
    pub const fn new() -> Self {
        Self {
            framebuffer: Framebuffer::new(),
            state: ProtocolState::AwaitingCommand,
            command: 0,
            position: 0,
            context: None,
            flush: FlushRequest::new(),
            response: IDLE_RESPONSE,
        }
    }

    /// Advances the machine by one inbound byte.
    ///
    /// Returns the response byte to expose on the link for the next transaction.
    pub fn accept(&mut self, byte: u8) -> u8 {
        match self.state {
            ProtocolState::AwaitingCommand => {
                self.command = byte;
                self.position = 0;
                self.context = CommandContext::begin(byte);
                self.response = COMMAND_ECHO;
                self.state = ProtocolState::GotCommandByte;
            }
            ProtocolState::GotCommandByte => {
                if byte == complement(self.command) {
                    self.response = COMPLEMENT_ECHO;
                    self.state = ProtocolState::GotComplementByte;
                } else {
                    debug!("framing error: cmd {:#x} complement {:#x}", self.command, byte);
                    self.context = None;
                    self.response = NACK_HEAD;
                    self.state = ProtocolState::AwaitingCommand;
                }
            }
            ProtocolState::GotComplementByte => self.feed_body(byte),
            ProtocolState::AwaitingAck => {
                // The byte only clocks the ACK/NACK out; the response stays as it is.
                self.state = ProtocolState::AwaitingCommand;
            }
        }

        self.response
    }

    fn feed_body(&mut self, byte: u8) {
        let result = match self.context.as_mut() {
            Some(context) => {
                context.feed(byte, self.position, &mut self.framebuffer, &mut self.flush)
            }
            None => {
                debug!("unknown command {:#x}", self.command);
                HandlerResult::Error
            }
        };

        match result {
            HandlerResult::Processing => {
                self.response = self.position;
                self.position = self.position.wrapping_add(1);
            }
            HandlerResult::Complete => {
                self.finish(ACK);
            }
            HandlerResult::Error => {
                self.finish(NACK_TAIL);
            }
        }
    }

    fn finish(&mut self, response: u8) {
        self.context = None;
        self.response = response;
        self.state = ProtocolState::AwaitingAck;
    }

    /// Abandons any command in progress after the link went quiet.
    ///
    /// Returns the `TIMEOUT` response.
    pub fn reset_on_timeout(&mut self) -> u8 {
        if self.state != ProtocolState::AwaitingCommand {
            debug!("timeout in {}, resynchronising", self.state);
        }
        self.state = ProtocolState::AwaitingCommand;
        self.position = 0;
        self.context = None;
        self.response = TIMEOUT;
        self.response
    }

    /// Returns whether the LED string needs refreshing, clearing the request.
    pub fn take_flush_request(&mut self) -> bool {
        self.flush.take()
    }

    /// Returns true if an `Update` has been applied but not yet flushed.
    pub fn flush_pending(&self) -> bool {
        self.flush.is_pending()
    }

    /// Current framing state.
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// The response byte queued for the next transaction.
    pub fn response(&self) -> u8 {
        self.response
    }

    /// Scratch of the command in progress, if any.
    pub fn context(&self) -> Option<&CommandContext> {
        self.context.as_ref()
    }

    /// The framebuffer commands are applied to.
    pub fn framebuffer(&self) -> &Framebuffer<W, H> {
        &self.framebuffer
    }
}

impl<const W: usize, const H: usize> Default for CommandEngine<W, H> {
    fn default() -> Self {
        Self::new()
    }
}
