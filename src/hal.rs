//! Collaborator traits for the board peripherals.
//!
//! Implement these for your hardware (LED current drivers, ADC sampler,
//! ambient light sensor, colour table) to let the state machine and the
//! calibration engine drive it.

use crate::ambient::Thresholds;
use crate::feedback::{self, Pulse, Tint};
use crate::types::{ChannelLevels, LedMask, Pot};
use embedded_hal::delay::DelayNs;

/// Trait for abstracting the LED current drivers.
pub trait Actuator {
    /// Sets the PWM levels shared by every lit LED.
    ///
    /// Levels are already clamped to `0..=PWM_PERIOD`. Handle any hardware
    /// errors internally - this method cannot fail.
    fn set_channel_levels(&mut self, levels: ChannelLevels);

    /// Switches individual LEDs on or off (and latches dot correction).
    fn configure_leds(&mut self, mask: LedMask);

    /// Plays a feedback pulse pattern.
    ///
    /// The default implementation steps through [`Pulse::steps`] with
    /// `set_channel_levels` and blocks on `delay` for each frame.
    fn flash<D: DelayNs>(&mut self, delay: &mut D, pulse: Pulse, tint: Tint) {
        feedback::play(self, delay, pulse, tint);
    }
}

/// Trait for abstracting the potentiometer ADC sampler.
pub trait PotSampler {
    /// Latest raw conversion of `pot`.
    fn pot_raw(&mut self, pot: Pot) -> u16;

    /// Moving average of the last few conversions of `pot`.
    fn pot_moving_average(&mut self, pot: Pot) -> u16;
}

/// Trait for abstracting the ambient light sensor.
pub trait AmbientSensor {
    /// Error type of the sensor bus.
    type Error;

    /// True when a conversion finished since the last reading was taken.
    fn light_ready(&mut self) -> bool;

    /// Reads the finished conversion in milli-lux and clears the ready signal.
    fn take_lux_reading(&mut self) -> Result<u32, Self::Error>;
}

/// Trait for abstracting the colour temperature table and the hysteresis calculator.
pub trait ColourModel {
    /// PWM levels reproducing colour temperature `kelvin`.
    fn kelvin_to_pulses(&self, kelvin: u32) -> ChannelLevels;

    /// Turn-on/turn-off thresholds for the sensitivity pot reading.
    fn hysteresis_thresholds(&self, sensitivity: u16) -> Thresholds;
}

/// The peripherals the driver loop owns.
pub struct Board<A, P, S, C, D> {
    pub leds: A,
    pub pots: P,
    pub sensor: S,
    pub colour: C,
    pub delay: D,
}

impl<A, P, S, C, D> Board<A, P, S, C, D>
where
    A: Actuator,
    D: DelayNs,
{
    /// Plays `pulse` on the LEDs, blocking for its duration.
    pub(crate) fn flash(&mut self, pulse: Pulse, tint: Tint) {
        self.leds.flash(&mut self.delay, pulse, tint);
    }
}
