//! Shared test infrastructure for led-matrix-link integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::collections::VecDeque;

use led_matrix_link::{
    LedStrip, Peripheral, Pixel, SlaveLink, TimeDuration, TimeInstant, TimeSource,
};

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    fn as_millis(&self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        TestDuration(millis)
    }
}

/// Mock instant type for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0 - earlier.0)
    }
}

/// Mock time source with controllable time advancement
pub struct MockTimeSource {
    current_time: core::cell::Cell<TestInstant>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self {
            current_time: core::cell::Cell::new(TestInstant(0)),
        }
    }

    /// Advance time by the given number of milliseconds
    pub fn advance(&self, millis: u64) {
        let current = self.current_time.get();
        self.current_time.set(TestInstant(current.0 + millis));
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Mock Link
// ============================================================================

/// Mock serial link: a queue of inbound bytes and a record of every response
pub struct MockLink {
    inbound: VecDeque<u8>,
    responses: Vec<u8>,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            responses: Vec::new(),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    pub fn responses(&self) -> &[u8] {
        &self.responses
    }

    pub fn last_response(&self) -> Option<u8> {
        self.responses.last().copied()
    }

    pub fn clear_responses(&mut self) {
        self.responses.clear();
    }
}

impl SlaveLink for MockLink {
    fn poll_byte(&mut self) -> Option<u8> {
        self.inbound.pop_front()
    }

    fn set_response(&mut self, byte: u8) {
        self.responses.push(byte);
    }
}

// ============================================================================
// Mock LED Strip
// ============================================================================

/// Mock LED string that records every frame written
pub struct MockStrip {
    frames: Vec<Vec<Pixel>>,
}

impl MockStrip {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn frames(&self) -> &[Vec<Pixel>] {
        &self.frames
    }
}

impl LedStrip for MockStrip {
    fn write(&mut self, pixels: &[Pixel]) {
        self.frames.push(pixels.to_vec());
    }
}

// ============================================================================
// Test Helper Functions
// ============================================================================

pub type TestPeripheral<'t> = Peripheral<'t, TestInstant, MockTimeSource, MockLink, MockStrip, 10, 6>;

pub fn peripheral(timer: &MockTimeSource) -> TestPeripheral<'_> {
    Peripheral::new(MockLink::new(), MockStrip::new(), timer)
}

/// Feeds `bytes` one per service call, without letting time pass.
/// Returns the response queued after each byte.
pub fn transact(peripheral: &mut TestPeripheral<'_>, bytes: &[u8]) -> Vec<u8> {
    peripheral.link_mut().clear_responses();
    peripheral.link_mut().push(bytes);
    for _ in bytes {
        peripheral.service();
    }
    peripheral.link().responses().to_vec()
}
