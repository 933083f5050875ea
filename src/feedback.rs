//! Visual feedback pulse patterns.
//!
//! Every pattern is a short list of timed frames, each holding one color on
//! all channels. Patterns end on the lit frame so the user sees the LEDs
//! come back after the last blink.
//!
//! | Pattern | Meaning |
//! |---|---|
//! | `Single` | step captured |
//! | `Double` | calibration mode entered or exited |
//! | `Long` | phase or calibration completed |
//!
//! The red tint of any pattern signals a failure or abort.

use crate::colors::{self, BLACK, RED, WHITE};
use crate::config::{LONG_PULSE_GAP_MS, PULSE_FRAME_MS};
use crate::hal::Actuator;
use embedded_hal::delay::DelayNs;
use heapless::Vec;
use palette::Srgb;

/// Most frames in any pattern.
pub const MAX_PULSE_FRAMES: usize = 5;

/// Shape of a feedback pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pulse {
    Single,
    Double,
    Long,
}

/// Color of the lit frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tint {
    Normal,
    Red,
}

impl Tint {
    /// Color shown on the lit frames.
    #[inline]
    pub fn color(self) -> Srgb {
        match self {
            Tint::Normal => WHITE,
            Tint::Red => RED,
        }
    }
}

/// A single frame of a pulse pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseFrame {
    /// Color held on every channel.
    pub color: Srgb,

    /// Hold time in milliseconds.
    pub hold_ms: u32,
}

impl PulseFrame {
    #[inline]
    const fn new(color: Srgb, hold_ms: u32) -> Self {
        Self { color, hold_ms }
    }
}

impl Pulse {
    /// Frames of this pattern in the given tint.
    pub fn steps(self, tint: Tint) -> Vec<PulseFrame, MAX_PULSE_FRAMES> {
        let on = tint.color();
        let frame = PULSE_FRAME_MS;
        let frames = match self {
            Pulse::Single => Vec::from_slice(&[
                PulseFrame::new(on, frame),
                PulseFrame::new(BLACK, frame),
                PulseFrame::new(on, frame),
            ]),
            Pulse::Double => Vec::from_slice(&[
                PulseFrame::new(on, frame),
                PulseFrame::new(BLACK, frame),
                PulseFrame::new(on, frame),
                PulseFrame::new(BLACK, frame),
                PulseFrame::new(on, frame),
            ]),
            Pulse::Long => Vec::from_slice(&[
                PulseFrame::new(on, frame),
                PulseFrame::new(BLACK, LONG_PULSE_GAP_MS),
                PulseFrame::new(on, frame),
            ]),
        };

        // Every pattern fits in MAX_PULSE_FRAMES.
        frames.unwrap_or_default()
    }
}

/// Plays `pulse` on `leds`, blocking on `delay` for every frame.
pub fn play<A: Actuator + ?Sized, D: DelayNs>(leds: &mut A, delay: &mut D, pulse: Pulse, tint: Tint) {
    trace!("feedback: {:?} pulse, {:?}", pulse, tint);
    for frame in pulse.steps(tint) {
        leds.set_channel_levels(colors::to_levels(frame.color));
        delay.delay_ms(frame.hold_ms);
    }
}
