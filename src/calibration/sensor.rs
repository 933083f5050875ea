//! Ambient light sensor calibration.
//!
//! A blocking run of three phases. Each phase drives the LEDs through a
//! sweep of outputs and records how much of that light the sensor sees:
//!
//! | Phase | Increments | Output at increment `i` |
//! |---|---|---|
//! | `Brightness` | `NUM_CAL_INCS + 1` | grey at `i / NUM_CAL_INCS` of full scale |
//! | `White` | `NUM_CAL_INCS + 1` | colour temperature stepped from `KELVIN_MIN` to `KELVIN_MAX` |
//! | `Colour` | `NUM_CAL_INCS` | hue wheel in `NUM_CAL_INCS` equal slices |
//!
//! Every sweep is bracketed by a baseline with the LEDs off, at buffer
//! index 0 and at index `increments + 1`. The two baselines must agree
//! (see [`check_drift`]) or the phase is retried.
//!
//! A phase gets up to `MAX_PHASE_ATTEMPTS` attempts. Noisy samples, drifted
//! baselines and sensor bus errors are retried; a sensor that stops
//! producing readings, a pot 3 hold seen between samples, or running out of
//! attempts ends the whole run.

use super::stats::{self, CalSample, check_drift};
use super::CalibrationError;
use crate::colors;
use crate::config::{
    CAL_BUFFER_LEN, KELVIN_MAX, KELVIN_MIN, MAX_PHASE_ATTEMPTS, NUM_CAL_INCS, NUM_CAL_SAMPLES,
    PWM_PERIOD, SENSOR_POLL_INTERVAL_MS, SENSOR_TIMEOUT_MS,
};
use crate::event::{EventMailbox, EventType};
use crate::feedback::{Pulse, Tint};
use crate::hal::{Actuator, AmbientSensor, Board, ColourModel};
use crate::types::ChannelLevels;
use embedded_hal::delay::DelayNs;

/// Event that aborts a running sensor calibration.
pub const SENSOR_CAL_ABORT: EventType = EventType::Pot3Hold;

/// One sweep of the sensor calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorCalPhase {
    Brightness,
    White,
    Colour,
}

impl SensorCalPhase {
    /// Phases in the order they run.
    pub const ALL: [SensorCalPhase; 3] = [
        SensorCalPhase::Brightness,
        SensorCalPhase::White,
        SensorCalPhase::Colour,
    ];

    /// Number of lit outputs swept between the two baselines.
    #[inline]
    pub const fn increments(self) -> usize {
        match self {
            SensorCalPhase::Brightness | SensorCalPhase::White => NUM_CAL_INCS + 1,
            SensorCalPhase::Colour => NUM_CAL_INCS,
        }
    }

    /// Buffer index of the trailing baseline.
    #[inline]
    pub const fn trailing_index(self) -> usize {
        self.increments() + 1
    }

    /// LED output for increment `step` (zero-based) of this phase.
    pub fn levels<C: ColourModel + ?Sized>(self, step: usize, colour: &C) -> ChannelLevels {
        match self {
            SensorCalPhase::Brightness => {
                let level = (step * PWM_PERIOD as usize) / NUM_CAL_INCS;
                ChannelLevels::grey(level.min(PWM_PERIOD as usize) as u16)
            }
            SensorCalPhase::White => {
                let span = (KELVIN_MAX - KELVIN_MIN) as usize;
                let kelvin = KELVIN_MIN as usize + (step * span) / NUM_CAL_INCS;
                colour.kelvin_to_pulses(kelvin.min(KELVIN_MAX as usize) as u32)
            }
            SensorCalPhase::Colour => colors::hue_wheel_levels(step, NUM_CAL_INCS),
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            SensorCalPhase::Brightness => 1,
            SensorCalPhase::White => 2,
            SensorCalPhase::Colour => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(SensorCalPhase::Brightness),
            2 => Some(SensorCalPhase::White),
            3 => Some(SensorCalPhase::Colour),
            _ => None,
        }
    }
}

/// Position in the sensor calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorCalSubstate {
    #[default]
    Idle,
    /// Sampling buffer index `step` of `phase`.
    Capturing { phase: SensorCalPhase, step: u8 },
}

/// Samples recorded by the sensor calibration, one buffer per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorCalBuffers {
    pub brightness: [CalSample; CAL_BUFFER_LEN],
    pub white: [CalSample; CAL_BUFFER_LEN],
    pub colour: [CalSample; CAL_BUFFER_LEN],
}

impl SensorCalBuffers {
    pub const EMPTY: Self = Self {
        brightness: [CalSample { mean: 0, variance: 0 }; CAL_BUFFER_LEN],
        white: [CalSample { mean: 0, variance: 0 }; CAL_BUFFER_LEN],
        colour: [CalSample { mean: 0, variance: 0 }; CAL_BUFFER_LEN],
    };

    /// Buffer of `phase`.
    pub fn phase(&self, phase: SensorCalPhase) -> &[CalSample; CAL_BUFFER_LEN] {
        match phase {
            SensorCalPhase::Brightness => &self.brightness,
            SensorCalPhase::White => &self.white,
            SensorCalPhase::Colour => &self.colour,
        }
    }

    pub fn phase_mut(&mut self, phase: SensorCalPhase) -> &mut [CalSample; CAL_BUFFER_LEN] {
        match phase {
            SensorCalPhase::Brightness => &mut self.brightness,
            SensorCalPhase::White => &mut self.white,
            SensorCalPhase::Colour => &mut self.colour,
        }
    }
}

impl Default for SensorCalBuffers {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Polls the ready signal every `SENSOR_POLL_INTERVAL_MS` and takes the
/// reading once it is set.
pub fn wait_for_reading<S, D>(sensor: &mut S, delay: &mut D) -> Result<u32, CalibrationError>
where
    S: AmbientSensor,
    D: DelayNs,
{
    let mut waited = 0u32;
    while !sensor.light_ready() {
        if waited >= SENSOR_TIMEOUT_MS {
            warn!("sensor calibration: no reading after {} ms", waited);
            return Err(CalibrationError::SensorTimeout);
        }
        delay.delay_ms(SENSOR_POLL_INTERVAL_MS);
        waited += SENSOR_POLL_INTERVAL_MS;
    }
    sensor
        .take_lux_reading()
        .map_err(|_| CalibrationError::SensorFault)
}

/// Records one statistically validated sample at `buffer[index]`.
///
/// The conversion already in flight was started under the previous LED
/// output, so it is read and dropped first. A pot 3 hold posted while the
/// readings are collected aborts the sample.
pub fn collect_sample<A, P, S, C, D>(
    board: &mut Board<A, P, S, C, D>,
    mailbox: &EventMailbox,
    buffer: &mut [CalSample],
    index: usize,
) -> Result<CalSample, CalibrationError>
where
    A: Actuator,
    S: AmbientSensor,
    D: DelayNs,
{
    let result = sample_readings(board, mailbox).and_then(|readings| stats::evaluate(&readings));

    match result {
        Ok(sample) => {
            if let Some(slot) = buffer.get_mut(index) {
                *slot = sample;
            }
            trace!(
                "sensor calibration: [{}] mean {} variance {}",
                index, sample.mean, sample.variance
            );
            Ok(sample)
        }
        Err(err) => {
            if err.is_retryable() {
                board.flash(Pulse::Single, Tint::Red);
            }
            Err(err)
        }
    }
}

fn sample_readings<A, P, S, C, D>(
    board: &mut Board<A, P, S, C, D>,
    mailbox: &EventMailbox,
) -> Result<[u32; NUM_CAL_SAMPLES], CalibrationError>
where
    S: AmbientSensor,
    D: DelayNs,
{
    wait_for_reading(&mut board.sensor, &mut board.delay)?;

    let mut readings = [0u32; NUM_CAL_SAMPLES];
    for reading in readings.iter_mut() {
        *reading = wait_for_reading(&mut board.sensor, &mut board.delay)?;
        if mailbox.take_if(SENSOR_CAL_ABORT) {
            info!("sensor calibration: abort requested");
            return Err(CalibrationError::Aborted);
        }
    }
    Ok(readings)
}

/// One attempt at `phase`: leading baseline, sweep, trailing baseline and
/// the drift check.
pub fn run_phase<A, P, S, C, D>(
    board: &mut Board<A, P, S, C, D>,
    mailbox: &EventMailbox,
    buffers: &mut SensorCalBuffers,
    substate: &mut SensorCalSubstate,
    phase: SensorCalPhase,
) -> Result<(), CalibrationError>
where
    A: Actuator,
    S: AmbientSensor,
    C: ColourModel,
    D: DelayNs,
{
    let buffer = buffers.phase_mut(phase);
    let trailing = phase.trailing_index();

    for index in 0..=trailing {
        *substate = SensorCalSubstate::Capturing {
            phase,
            step: index as u8,
        };
        let levels = if index == 0 || index == trailing {
            ChannelLevels::OFF
        } else {
            phase.levels(index - 1, &board.colour)
        };
        board.leds.set_channel_levels(levels);
        collect_sample(board, mailbox, &mut buffer[..], index)?;
    }

    if let Err(err) = check_drift(&buffer[0], &buffer[trailing]) {
        board.flash(Pulse::Single, Tint::Red);
        return Err(err);
    }
    Ok(())
}

/// Runs `phase` until it passes or its attempts are used up.
pub fn run_phase_with_retries<A, P, S, C, D>(
    board: &mut Board<A, P, S, C, D>,
    mailbox: &EventMailbox,
    buffers: &mut SensorCalBuffers,
    substate: &mut SensorCalSubstate,
    phase: SensorCalPhase,
) -> Result<(), CalibrationError>
where
    A: Actuator,
    S: AmbientSensor,
    C: ColourModel,
    D: DelayNs,
{
    for attempt in 1..=MAX_PHASE_ATTEMPTS {
        match run_phase(board, mailbox, buffers, substate, phase) {
            Ok(()) => {
                info!("sensor calibration: {:?} phase done on attempt {}", phase, attempt);
                board.flash(Pulse::Long, Tint::Normal);
                return Ok(());
            }
            Err(err) if err.is_retryable() => {
                warn!(
                    "sensor calibration: {:?} attempt {} failed: {:?}",
                    phase, attempt, err
                );
            }
            Err(err) => return Err(err),
        }
    }
    Err(CalibrationError::RetriesExhausted { phase })
}

/// Runs every phase in order. `substate` is back at `Idle` when this
/// returns, whatever the outcome.
pub fn run<A, P, S, C, D>(
    board: &mut Board<A, P, S, C, D>,
    mailbox: &EventMailbox,
    buffers: &mut SensorCalBuffers,
    substate: &mut SensorCalSubstate,
) -> Result<(), CalibrationError>
where
    A: Actuator,
    S: AmbientSensor,
    C: ColourModel,
    D: DelayNs,
{
    let result = SensorCalPhase::ALL
        .iter()
        .try_for_each(|&phase| run_phase_with_retries(board, mailbox, buffers, substate, phase));
    *substate = SensorCalSubstate::Idle;
    result
}
