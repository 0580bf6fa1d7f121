#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use led_matrix_link::{LedStrip, MatrixPeripheral, Pixel, SlaveLink, TickCounter};
use panic_halt as _;

// ============================================================================
// Tick Source
// ============================================================================

static TICKS: TickCounter = TickCounter::new();

#[exception]
fn SysTick() {
    TICKS.tick();
}

// ============================================================================
// Minimal Link Implementation
// ============================================================================

/// Link whose inbound bytes the optimizer cannot predict
pub struct MinimalLink;

impl SlaveLink for MinimalLink {
    fn poll_byte(&mut self) -> Option<u8> {
        core::hint::black_box(None)
    }

    fn set_response(&mut self, byte: u8) {
        core::hint::black_box(byte);
    }
}

// ============================================================================
// Minimal LED String Implementation
// ============================================================================

/// Zero-size LED string for measuring library overhead
pub struct MinimalStrip;

impl LedStrip for MinimalStrip {
    fn write(&mut self, pixels: &[Pixel]) {
        core::hint::black_box(pixels);
    }
}

#[entry]
fn main() -> ! {
    let mut peripheral = MatrixPeripheral::new(MinimalLink, MinimalStrip, &TICKS);

    // Size analysis binary: the loop is the whole firmware minus real drivers
    loop {
        core::hint::black_box(peripheral.service());
    }
}
