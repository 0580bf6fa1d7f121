//! Pixel color type and helpers.
//!
//! Pixels are `palette::Srgb<u8>`: one byte per channel, exactly what travels on the
//! wire and what the LED driver consumes.

use palette::Srgb;

/// A single framebuffer pixel.
pub type Pixel = Srgb<u8>;

pub const BLACK: Pixel = Srgb::new(0, 0, 0);
pub const WHITE: Pixel = Srgb::new(255, 255, 255);
pub const RED: Pixel = Srgb::new(255, 0, 0);
pub const GREEN: Pixel = Srgb::new(0, 255, 0);
pub const BLUE: Pixel = Srgb::new(0, 0, 255);

/// Builds a pixel from raw channel bytes in R, G, B order.
#[inline]
pub const fn from_bytes(rgb: [u8; 3]) -> Pixel {
    Srgb::new(rgb[0], rgb[1], rgb[2])
}

/// Parses one hex color component such as `"0xff"`, `"0XFF"` or `"ff"`.
///
/// Returns `None` for empty input, more than two digits, or non-hex characters.
pub fn parse_hex_byte(text: &str) -> Option<u8> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    u8::from_str_radix(digits, 16).ok()
}
