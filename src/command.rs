//! Command codes and the per-command body handlers.
//!
//! Each command consumes its body one byte per link transaction. Partially assembled
//! data lives in a [`CommandContext`], rebuilt from zero whenever a new command byte is
//! accepted, so nothing from a previous command can leak into the next.

use crate::colors;
use crate::framebuffer::Framebuffer;

/// Command identifiers as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandCode {
    /// Turn every pixel off.
    Clear = 0x01,
    /// Set every pixel to one color. Body: R, G, B.
    Fill = 0x02,
    /// Push the framebuffer out to the LED string.
    Update = 0x03,
    /// Set a single pixel. Body: X, Y, R, G, B.
    SetPixel = 0x04,
    /// Reserved: declared by the protocol, never dispatched by the peripheral.
    SetNPixels = 0x05,
    /// Diagnostic no-op for checking link framing.
    SmallEmpty = 0x06,
}

impl CommandCode {
    /// Decodes a command byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(CommandCode::Clear),
            0x02 => Some(CommandCode::Fill),
            0x03 => Some(CommandCode::Update),
            0x04 => Some(CommandCode::SetPixel),
            0x05 => Some(CommandCode::SetNPixels),
            0x06 => Some(CommandCode::SmallEmpty),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// The framing check byte that must follow the command byte.
    #[inline]
    pub const fn complement(self) -> u8 {
        complement(self as u8)
    }
}

/// Bitwise complement of a command byte.
#[inline]
pub const fn complement(code: u8) -> u8 {
    code ^ 0xFF
}

/// Outcome of feeding one body byte to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandlerResult {
    /// More body bytes are expected.
    Processing,
    /// The command has been applied.
    Complete,
    /// The body could not be applied.
    Error,
}

/// "Framebuffer changed, LED string not yet refreshed."
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlushRequest(bool);

impl FlushRequest {
    /// Creates a request with nothing pending.
    pub const fn new() -> Self {
        FlushRequest(false)
    }

    /// Marks the LED string as stale.
    pub fn raise(&mut self) {
        self.0 = true;
    }

    /// Returns true if a flush has been requested and not yet taken.
    pub fn is_pending(&self) -> bool {
        self.0
    }

    /// Returns whether a flush was pending and clears the request.
    pub fn take(&mut self) -> bool {
        core::mem::take(&mut self.0)
    }
}

/// Scratch state of the command currently in progress.
///
/// One variant per dispatchable command; each carries only the bytes that command
/// needs to stage before it can act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandContext {
    Clear,
    Fill { rgb: [u8; 3] },
    Update,
    SetPixel { x: u8, y: u8, rgb: [u8; 3] },
    SmallEmpty,
}

impl CommandContext {
    /// Creates zeroed scratch for a freshly received command byte.
    ///
    /// Returns `None` for unknown codes and for the reserved `SetNPixels`; those
    /// commands are rejected without ever reaching a handler.
    pub fn begin(code: u8) -> Option<Self> {
        match CommandCode::from_byte(code)? {
            CommandCode::Clear => Some(CommandContext::Clear),
            CommandCode::Fill => Some(CommandContext::Fill { rgb: [0; 3] }),
            CommandCode::Update => Some(CommandContext::Update),
            CommandCode::SetPixel => Some(CommandContext::SetPixel {
                x: 0,
                y: 0,
                rgb: [0; 3],
            }),
            CommandCode::SmallEmpty => Some(CommandContext::SmallEmpty),
            CommandCode::SetNPixels => None,
        }
    }

    /// The command this context belongs to.
    pub fn code(&self) -> CommandCode {
        match self {
            CommandContext::Clear => CommandCode::Clear,
            CommandContext::Fill { .. } => CommandCode::Fill,
            CommandContext::Update => CommandCode::Update,
            CommandContext::SetPixel { .. } => CommandCode::SetPixel,
            CommandContext::SmallEmpty => CommandCode::SmallEmpty,
        }
    }

    /// Feeds the body byte at `position` (zero-based, counted after the complement).
    ///
    /// Commands without a body act on their first byte, whatever its value.
    pub fn feed<const W: usize, const H: usize>(
        &mut self,
        byte: u8,
        position: u8,
        framebuffer: &mut Framebuffer<W, H>,
        flush: &mut FlushRequest,
    ) -> HandlerResult {
        match self {
            CommandContext::Clear => {
                framebuffer.clear();
                HandlerResult::Complete
            }
            CommandContext::Fill { rgb } => fill(rgb, byte, position, framebuffer),
            CommandContext::Update => {
                flush.raise();
                HandlerResult::Complete
            }
            CommandContext::SetPixel { x, y, rgb } => {
                set_pixel(x, y, rgb, byte, position, framebuffer)
            }
            CommandContext::SmallEmpty => HandlerResult::Complete,
        }
    }
}

fn fill<const W: usize, const H: usize>(
    rgb: &mut [u8; 3],
    byte: u8,
    position: u8,
    framebuffer: &mut Framebuffer<W, H>,
) -> HandlerResult {
    match position {
        0 | 1 => {
            rgb[position as usize] = byte;
            HandlerResult::Processing
        }
        2 => {
            rgb[2] = byte;
            framebuffer.fill(colors::from_bytes(*rgb));
            HandlerResult::Complete
        }
        _ => HandlerResult::Error,
    }
}

fn set_pixel<const W: usize, const H: usize>(
    x: &mut u8,
    y: &mut u8,
    rgb: &mut [u8; 3],
    byte: u8,
    position: u8,
    framebuffer: &mut Framebuffer<W, H>,
) -> HandlerResult {
    match position {
        0 => {
            *x = byte;
            HandlerResult::Processing
        }
        1 => {
            *y = byte;
            HandlerResult::Processing
        }
        2 | 3 => {
            rgb[position as usize - 2] = byte;
            HandlerResult::Processing
        }
        4 => {
            rgb[2] = byte;
            match framebuffer.set_pixel(*x as usize, *y as usize, colors::from_bytes(*rgb)) {
                Ok(()) => HandlerResult::Complete,
                Err(_) => {
                    warn!("set pixel ({}, {}) out of range", *x, *y);
                    HandlerResult::Error
                }
            }
        }
        _ => HandlerResult::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{BLACK, RED};
    use crate::framebuffer::MatrixFramebuffer;

    fn feed_all(ctx: &mut CommandContext, body: &[u8], fb: &mut MatrixFramebuffer) -> HandlerResult {
        let mut flush = FlushRequest::default();
        let mut last = HandlerResult::Processing;
        for (position, &byte) in body.iter().enumerate() {
            last = ctx.feed(byte, position as u8, fb, &mut flush);
        }
        last
    }

    #[test]
    fn complement_matches_wire_table() {
        assert_eq!(CommandCode::Clear.complement(), 0xFE);
        assert_eq!(CommandCode::Fill.complement(), 0xFD);
        assert_eq!(CommandCode::SmallEmpty.complement(), 0xF9);
    }

    #[test]
    fn begin_rejects_unknown_and_reserved_codes() {
        assert_eq!(CommandContext::begin(0x00), None);
        assert_eq!(CommandContext::begin(0x05), None);
        assert_eq!(CommandContext::begin(0x07), None);
        assert_eq!(CommandContext::begin(0xFF), None);
    }

    #[test]
    fn fill_stages_color_until_third_byte() {
        let mut fb = MatrixFramebuffer::new();
        let mut flush = FlushRequest::default();
        let mut ctx = CommandContext::begin(0x02).unwrap();

        assert_eq!(ctx.feed(0x10, 0, &mut fb, &mut flush), HandlerResult::Processing);
        assert_eq!(ctx.feed(0x20, 1, &mut fb, &mut flush), HandlerResult::Processing);
        assert_eq!(fb.pixel(0, 0), Some(BLACK));
        assert_eq!(ctx.feed(0x30, 2, &mut fb, &mut flush), HandlerResult::Complete);

        let expected = colors::from_bytes([0x10, 0x20, 0x30]);
        assert!(fb.as_flush_buffer().iter().all(|p| *p == expected));
    }

    #[test]
    fn set_pixel_applies_on_fifth_byte() {
        let mut fb = MatrixFramebuffer::new();
        let mut ctx = CommandContext::begin(0x04).unwrap();

        let result = feed_all(&mut ctx, &[1, 2, 0xFF, 0, 0], &mut fb);
        assert_eq!(result, HandlerResult::Complete);
        assert_eq!(fb.pixel(1, 2), Some(RED));
    }

    #[test]
    fn set_pixel_out_of_range_is_an_error() {
        let mut fb = MatrixFramebuffer::new();
        let mut ctx = CommandContext::begin(0x04).unwrap();

        let result = feed_all(&mut ctx, &[200, 0, 0xFF, 0, 0], &mut fb);
        assert_eq!(result, HandlerResult::Error);
        assert_eq!(fb, MatrixFramebuffer::new());
    }

    #[test]
    fn update_raises_flush_request() {
        let mut fb = MatrixFramebuffer::new();
        let mut flush = FlushRequest::default();
        let mut ctx = CommandContext::begin(0x03).unwrap();

        assert_eq!(ctx.feed(0, 0, &mut fb, &mut flush), HandlerResult::Complete);
        assert!(flush.is_pending());
        assert!(flush.take());
        assert!(!flush.is_pending());
    }

    #[test]
    fn fresh_context_is_zeroed() {
        let mut fb = MatrixFramebuffer::new();
        let mut ctx = CommandContext::begin(0x04).unwrap();
        feed_all(&mut ctx, &[3, 3, 9, 9], &mut fb);

        assert_eq!(
            CommandContext::begin(0x04),
            Some(CommandContext::SetPixel {
                x: 0,
                y: 0,
                rgb: [0; 3]
            })
        );
    }
}
