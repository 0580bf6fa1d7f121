use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use led_matrix_link::host::MasterLink;
use led_matrix_link::protocol::IDLE_RESPONSE;

const LINK_TIMEOUT: Duration = Duration::from_millis(100);

/// Quiet time before each frame. Longer than the peripheral's inter-byte timeout, so
/// its TIMEOUT byte for the previous gap is already buffered when the input is drained.
const DEFAULT_SETTLE: Duration = Duration::from_millis(5);

/// A byte stream that can report how much input is already buffered.
pub trait PendingInput: Read + Write {
    /// Number of received bytes waiting to be read.
    fn pending(&mut self) -> io::Result<usize>;
}

impl PendingInput for Box<dyn serialport::SerialPort> {
    fn pending(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }
}

/// Byte-serial link to the peripheral.
///
/// Over a UART the peripheral transmits every response it queues, including the idle
/// value at startup and TIMEOUT after each quiet gap. Those arrive unrequested, so they
/// are drained before each frame. The replies are then presented the way a full-duplex
/// transfer clocks them in: `rx[0]` is the last byte seen before the frame, and
/// `rx[i]` is the reply to `tx[i - 1]`.
pub struct SerialLink<P: PendingInput = Box<dyn serialport::SerialPort>> {
    port: P,
    settle: Duration,
    last: u8,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(LINK_TIMEOUT)
            .open()
            .with_context(|| format!("can't open serial port {path}"))?;

        log::debug!("opened {path} at {baud} baud");
        Ok(Self::new(port, DEFAULT_SETTLE))
    }
}

impl<P: PendingInput> SerialLink<P> {
    /// Wraps `port`, waiting `settle` before each frame.
    pub fn new(port: P, settle: Duration) -> Self {
        Self {
            port,
            settle,
            last: IDLE_RESPONSE,
        }
    }

    /// Discards buffered input, remembering the most recent byte.
    fn drain(&mut self) -> io::Result<()> {
        let mut stale = [0u8; 16];
        loop {
            let pending = self.port.pending()?.min(stale.len());
            if pending == 0 {
                return Ok(());
            }
            self.port.read_exact(&mut stale[..pending])?;
            log::debug!("drained {:02x?}", &stale[..pending]);
            self.last = stale[pending - 1];
        }
    }
}

impl<P: PendingInput> MasterLink for SerialLink<P> {
    type Error = io::Error;

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error> {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        self.drain()?;

        for (out, &byte) in rx.iter_mut().zip(tx) {
            *out = self.last;
            self.port.write_all(&[byte])?;
            let mut reply = [0u8; 1];
            self.port.read_exact(&mut reply)?;
            self.last = reply[0];
        }
        Ok(())
    }
}
