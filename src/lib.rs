#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`Framebuffer`**: Fixed `W x H` pixel grid stored in serpentine wiring order
//! - **`CommandContext`**: Scratch for the command in progress, one variant per command
//! - **`CommandEngine`**: Byte-at-a-time framing state machine that owns the framebuffer
//! - **`Peripheral`**: Polled service loop tying the engine to a link, an LED string and a clock
//! - **`SlaveLink`** / **`LedStrip`**: Traits to implement for your serial and LED hardware
//! - **`TimeSource`**: Trait to implement for your timing system; [`TickCounter`] is a ready-made one
//! - **`host::Controller`**: Encodes commands and checks acknowledgements on the controller side
//!
//! Pixels are `Srgb<u8>`: one byte per channel, exactly as they travel on the wire.

#[macro_use]
mod fmt;

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

pub mod colors;
pub mod command;
pub mod framebuffer;
pub mod host;
pub mod peripheral;
pub mod protocol;
pub mod time;

pub use colors::{BLACK, BLUE, GREEN, Pixel, RED, WHITE};
pub use command::{CommandCode, CommandContext, FlushRequest, HandlerResult};
pub use framebuffer::{Framebuffer, FramebufferError, MATRIX_HEIGHT, MATRIX_WIDTH, MatrixFramebuffer};
pub use peripheral::{
    DEFAULT_BYTE_TIMEOUT_MS, LedStrip, MatrixPeripheral, Peripheral, ServiceEvent, SlaveLink,
};
pub use protocol::{ACK, CommandEngine, NACK_HEAD, NACK_TAIL, NACK_UNK, ProtocolState, TIMEOUT};
pub use time::{TickCounter, TickDuration, TickInstant, TimeDuration, TimeInstant, TimeSource};
