//! Fixed-size LED matrix framebuffer with serpentine wiring.
//!
//! The physical string snakes through the matrix:
//!
//! ```text
//! row 0:  <---------|   (x = 0 is the last LED of the row)
//! row 1:  |--------->
//! row 2:  <---------|
//! ```
//!
//! Pixels are stored in wiring order so [`Framebuffer::as_flush_buffer`] can be handed
//! straight to the LED driver.

use crate::colors::{BLACK, Pixel};

/// Matrix width of the reference board.
pub const MATRIX_WIDTH: usize = 10;

/// Matrix height of the reference board.
pub const MATRIX_HEIGHT: usize = 6;

/// Framebuffer sized for the reference 10x6 board.
pub type MatrixFramebuffer = Framebuffer<MATRIX_WIDTH, MATRIX_HEIGHT>;

/// Errors returned by framebuffer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramebufferError {
    /// Coordinate lies outside the matrix.
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

impl core::fmt::Display for FramebufferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FramebufferError::OutOfBounds {
                x,
                y,
                width,
                height,
            } => {
                write!(
                    f,
                    "pixel ({}, {}) outside {}x{} matrix",
                    x, y, width, height
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FramebufferError {}

/// Statically sized grid of `W x H` pixels.
///
/// Never resized after construction; suitable for a `static` on a device without an
/// allocator.
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer<const W: usize, const H: usize> {
    // rows[y][wiring column]
    rows: [[Pixel; W]; H],
}

impl<const W: usize, const H: usize> Framebuffer<W, H> {
    /// Matrix width in pixels.
    pub const WIDTH: usize = W;

    /// Matrix height in pixels.
    pub const HEIGHT: usize = H;

    /// Total number of LEDs on the string.
    pub const LEN: usize = W * H;

    /// Creates a framebuffer with every pixel off.
    pub const fn new() -> Self {
        Self {
            rows: [[BLACK; W]; H],
        }
    }

    /// Maps a matrix coordinate to its column within the wired row.
    ///
    /// Even rows run right-to-left, odd rows left-to-right.
    #[inline]
    const fn wired_column(x: usize, y: usize) -> usize {
        if y & 1 == 1 { x } else { W - 1 - x }
    }

    /// Returns the position of `(x, y)` along the LED string, or `None` if out of range.
    pub const fn index_of(x: usize, y: usize) -> Option<usize> {
        if x >= W || y >= H {
            return None;
        }
        Some(y * W + Self::wired_column(x, y))
    }

    /// Overwrites the pixel at `(x, y)`.
    ///
    /// # Errors
    /// * `OutOfBounds` - The coordinate is outside the matrix; nothing is written.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Pixel) -> Result<(), FramebufferError> {
        if x >= W || y >= H {
            return Err(FramebufferError::OutOfBounds {
                x,
                y,
                width: W,
                height: H,
            });
        }

        self.rows[y][Self::wired_column(x, y)] = color;
        Ok(())
    }

    /// Returns the pixel at `(x, y)`, or `None` if out of range.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        if x >= W || y >= H {
            return None;
        }
        Some(self.rows[y][Self::wired_column(x, y)])
    }

    /// Turns every pixel off.
    pub fn clear(&mut self) {
        self.fill(BLACK);
    }

    /// Sets every pixel to `color`.
    pub fn fill(&mut self, color: Pixel) {
        for row in self.rows.iter_mut() {
            row.fill(color);
        }
    }

    /// Pixels in LED-string order, for the hardware output routine.
    pub fn as_flush_buffer(&self) -> &[Pixel] {
        self.rows.as_flattened()
    }
}

impl<const W: usize, const H: usize> Default for Framebuffer<W, H> {
    fn default() -> Self {
        Self::new()
    }
}
