//! Peripheral-side service loop.
//!
//! Provides [`Peripheral`], which ties the [`CommandEngine`] to a serial link, an LED
//! string and a millisecond time source. Also defines the [`SlaveLink`] and
//! [`LedStrip`] traits for hardware abstraction.

use crate::colors::Pixel;
use crate::framebuffer::{Framebuffer, MATRIX_HEIGHT, MATRIX_WIDTH};
use crate::protocol::{CommandEngine, IDLE_RESPONSE, ProtocolState};
use crate::time::{TickCounter, TickInstant, TimeDuration, TimeInstant, TimeSource};

/// Longest gap between two bytes of one command before the machine resynchronises.
pub const DEFAULT_BYTE_TIMEOUT_MS: u64 = 2;

/// Trait for abstracting the peripheral's side of the serial link.
///
/// Implement this for an SPI slave data register, a UART, or anything else that
/// moves one byte per transaction.
pub trait SlaveLink {
    /// Returns the next inbound byte if one has arrived. Must not block.
    fn poll_byte(&mut self) -> Option<u8>;

    /// Queues the byte the controller will read on its next transaction.
    fn set_response(&mut self, byte: u8);
}

/// Trait for abstracting the LED string output.
pub trait LedStrip {
    /// Writes the whole string, pixels in wiring order.
    ///
    /// Called synchronously from [`Peripheral::service`]; no inbound byte is
    /// processed until it returns. Handle any hardware errors internally - this
    /// method cannot fail.
    fn write(&mut self, pixels: &[Pixel]);
}

/// What a single [`Peripheral::service`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceEvent {
    /// No byte was waiting.
    Idle,
    /// The inter-byte timeout fired; the machine is back to awaiting a command.
    TimedOut,
    /// A byte was processed.
    Responded {
        /// Byte queued for the next transaction.
        response: u8,
        /// True if the LED string was refreshed afterwards.
        flushed: bool,
    },
}

/// Peripheral for the reference 10x6 board driven by a [`TickCounter`].
pub type MatrixPeripheral<'t, S, O> =
    Peripheral<'t, TickInstant, TickCounter, S, O, MATRIX_WIDTH, MATRIX_HEIGHT>;

/// The single owning object for protocol and hardware state on the peripheral.
///
/// # Type Parameters
/// * `'t` - Lifetime of the time source reference
/// * `I` - Time instant type
/// * `T` - Time source implementation type
/// * `S` - Serial link implementation type
/// * `O` - LED string implementation type
/// * `W` - Matrix width
/// * `H` - Matrix height
pub struct Peripheral<'t, I, T, S, O, const W: usize, const H: usize>
where
    I: TimeInstant,
    T: TimeSource<I>,
    S: SlaveLink,
    O: LedStrip,
{
    engine: CommandEngine<W, H>,
    link: S,
    strip: O,
    time_source: &'t T,
    byte_timeout: I::Duration,
    last_byte_time: I,
    timed_out: bool,
}

impl<'t, I, T, S, O, const W: usize, const H: usize> Peripheral<'t, I, T, S, O, W, H>
where
    I: TimeInstant,
    T: TimeSource<I>,
    S: SlaveLink,
    O: LedStrip,
{
    /// Creates a peripheral awaiting its first command.
    ///
    /// Primes the link with the idle response so the controller's first read is
    /// well defined.
    pub fn new(mut link: S, strip: O, time_source: &'t T) -> Self {
        link.set_response(IDLE_RESPONSE);

        Self {
            engine: CommandEngine::new(),
            link,
            strip,
            time_source,
            byte_timeout: I::Duration::from_millis(DEFAULT_BYTE_TIMEOUT_MS),
            last_byte_time: time_source.now(),
            timed_out: false,
        }
    }

    /// Overrides the inter-byte timeout.
    pub fn with_byte_timeout(mut self, timeout: I::Duration) -> Self {
        self.byte_timeout = timeout;
        self
    }

    /// Services the link once. Call this from the main loop as often as possible.
    ///
    /// Polls for a byte, applies the inter-byte timeout, advances the state machine and
    /// queues its response. If the command just completed was an `Update`, the LED
    /// string is written before returning.
    pub fn service(&mut self) -> ServiceEvent {
        let inbound = self.link.poll_byte();
        let now = self.time_source.now();
        let elapsed = now.duration_since(self.last_byte_time);

        // Checked before the byte is handled: a byte arriving after a long gap starts a
        // new command rather than continuing the stale one.
        if !self.timed_out && elapsed.as_millis() > self.byte_timeout.as_millis() {
            let response = self.engine.reset_on_timeout();
            self.timed_out = true;

            // The byte's own response replaces TIMEOUT, so only an idle link sends it.
            // Links that transmit every response would otherwise emit an extra byte.
            if inbound.is_none() {
                self.link.set_response(response);
                return ServiceEvent::TimedOut;
            }
        }

        let Some(byte) = inbound else {
            return ServiceEvent::Idle;
        };

        self.last_byte_time = now;
        self.timed_out = false;

        let response = self.engine.accept(byte);
        self.link.set_response(response);

        let flushed = self.engine.take_flush_request();
        if flushed {
            self.strip.write(self.engine.framebuffer().as_flush_buffer());
        }

        ServiceEvent::Responded { response, flushed }
    }

    /// Current framing state.
    pub fn state(&self) -> ProtocolState {
        self.engine.state()
    }

    /// The protocol engine, for inspection.
    pub fn engine(&self) -> &CommandEngine<W, H> {
        &self.engine
    }

    /// The pixels the next flush will write.
    pub fn framebuffer(&self) -> &Framebuffer<W, H> {
        self.engine.framebuffer()
    }

    /// The serial link.
    pub fn link(&self) -> &S {
        &self.link
    }

    /// Mutable access to the link, e.g. to inject bytes in a simulation.
    pub fn link_mut(&mut self) -> &mut S {
        &mut self.link
    }

    /// The LED string output.
    pub fn strip(&self) -> &O {
        &self.strip
    }
}
