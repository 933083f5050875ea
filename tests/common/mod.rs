//! Shared test infrastructure for nightlight-core integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin};
use nightlight_core::{
    Actuator, AmbientSensor, Board, ChannelLevels, ColourModel, EventMailbox, LedMask,
    NightLight, Pot, PotSampler, Pulse, Thresholds, Tint, TimeDuration, TimeInstant, TimeSource,
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
}

/// Mock instant type for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0.saturating_sub(earlier.0))
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

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

    pub fn set_time(&self, time: TestInstant) {
        self.current_time.set(time);
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Mock LED Driver
// ============================================================================

/// Mock LED driver that records levels, masks and feedback pulses
#[derive(Default)]
pub struct MockLeds {
    pub levels: Vec<ChannelLevels>,
    pub masks: Vec<LedMask>,
    pub flashes: Vec<(Pulse, Tint)>,
}

impl MockLeds {
    pub fn last_levels(&self) -> Option<ChannelLevels> {
        self.levels.last().copied()
    }

    pub fn last_mask(&self) -> Option<LedMask> {
        self.masks.last().copied()
    }

    pub fn count_flashes(&self, pulse: Pulse, tint: Tint) -> usize {
        self.flashes.iter().filter(|f| **f == (pulse, tint)).count()
    }
}

impl Actuator for MockLeds {
    fn set_channel_levels(&mut self, levels: ChannelLevels) {
        self.levels.push(levels);
    }

    fn configure_leds(&mut self, mask: LedMask) {
        self.masks.push(mask);
    }

    // Record pulses instead of playing them so the level history only holds
    // what the state machine and the calibration sweeps set.
    fn flash<D: DelayNs>(&mut self, _delay: &mut D, pulse: Pulse, tint: Tint) {
        self.flashes.push((pulse, tint));
    }
}

// ============================================================================
// Mock Potentiometers
// ============================================================================

/// Mock pot sampler returning settable readings
#[derive(Default)]
pub struct MockPots {
    pub raw: [u16; 3],
}

impl MockPots {
    pub fn set(&mut self, pot: Pot, value: u16) {
        self.raw[pot.index()] = value;
    }
}

impl PotSampler for MockPots {
    fn pot_raw(&mut self, pot: Pot) -> u16 {
        self.raw[pot.index()]
    }

    fn pot_moving_average(&mut self, pot: Pot) -> u16 {
        self.raw[pot.index()]
    }
}

// ============================================================================
// Mock Button Pins
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Mock active-low button pin
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPin {
    pub low: bool,
    pub faulty: bool,
}

impl MockPin {
    pub fn up() -> Self {
        Self::default()
    }

    pub fn down() -> Self {
        Self {
            low: true,
            faulty: false,
        }
    }
}

impl ErrorType for MockPin {
    type Error = PinFault;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        if self.faulty {
            Err(PinFault)
        } else {
            Ok(self.low)
        }
    }
}

// ============================================================================
// Mock Ambient Sensor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorBusError;

/// Mock light sensor fed from a script.
///
/// Scripted readings are returned first, then `cycle` repeats forever. With
/// both empty the sensor never signals ready.
pub struct MockSensor<'a> {
    pub script: VecDeque<u32>,
    pub cycle: Vec<u32>,
    cycle_pos: usize,
    /// Number of upcoming reads that fail with a bus error.
    pub faults: usize,
    /// Posts a pot 3 hold to the mailbox once this many readings were taken.
    pub abort_after: Option<(usize, &'a EventMailbox)>,
    pub taken: usize,
}

impl<'a> MockSensor<'a> {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            cycle: Vec::new(),
            cycle_pos: 0,
            faults: 0,
            abort_after: None,
            taken: 0,
        }
    }

    /// Sensor that always reads `lux`.
    pub fn constant(lux: u32) -> Self {
        let mut sensor = Self::new();
        sensor.cycle = vec![lux];
        sensor
    }

    /// Sensor that never produces a reading.
    pub fn silent() -> Self {
        Self::new()
    }

    pub fn push(&mut self, lux: u32, count: usize) {
        self.script.extend(std::iter::repeat_n(lux, count));
    }
}

impl AmbientSensor for MockSensor<'_> {
    type Error = SensorBusError;

    fn light_ready(&mut self) -> bool {
        !self.script.is_empty() || !self.cycle.is_empty()
    }

    fn take_lux_reading(&mut self) -> Result<u32, Self::Error> {
        self.taken += 1;
        if let Some((after, mailbox)) = self.abort_after {
            if self.taken == after {
                mailbox.post(nightlight_core::EventType::Pot3Hold);
            }
        }
        if self.faults > 0 {
            self.faults -= 1;
            return Err(SensorBusError);
        }
        if let Some(lux) = self.script.pop_front() {
            return Ok(lux);
        }
        let lux = self.cycle[self.cycle_pos % self.cycle.len()];
        self.cycle_pos += 1;
        Ok(lux)
    }
}

// ============================================================================
// Mock Colour Model
// ============================================================================

/// Linear stand-in for the Kelvin table and hysteresis calculator
pub struct MockColourModel;

impl ColourModel for MockColourModel {
    fn kelvin_to_pulses(&self, kelvin: u32) -> ChannelLevels {
        ChannelLevels::new((kelvin / 8) as u16, (kelvin / 10) as u16, (kelvin / 16) as u16)
    }

    fn hysteresis_thresholds(&self, sensitivity: u16) -> Thresholds {
        Thresholds::new(sensitivity as u32, sensitivity as u32 + 500)
    }
}

// ============================================================================
// Mock Delay
// ============================================================================

/// Delay that only counts the time it was asked to block
#[derive(Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl MockDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

// ============================================================================
// Test Helper Functions
// ============================================================================

pub type TestBoard<'a> = Board<MockLeds, MockPots, MockSensor<'a>, MockColourModel, MockDelay>;

pub type TestLight<'a> =
    NightLight<'a, MockLeds, MockPots, MockSensor<'a>, MockColourModel, MockDelay>;

pub fn board(sensor: MockSensor<'_>) -> TestBoard<'_> {
    Board {
        leds: MockLeds::default(),
        pots: MockPots::default(),
        sensor,
        colour: MockColourModel,
        delay: MockDelay::default(),
    }
}

/// Night light in standby with a sensor that never reports.
pub fn light(mailbox: &EventMailbox) -> TestLight<'_> {
    NightLight::new(board(MockSensor::silent()), mailbox)
}

pub fn light_with_sensor<'a>(mailbox: &'a EventMailbox, sensor: MockSensor<'a>) -> TestLight<'a> {
    NightLight::new(board(sensor), mailbox)
}
