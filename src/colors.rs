//! Color space conversion helpers.
//!
//! Pulse patterns and the RGB light work in `palette::Srgb` (0.0-1.0
//! range); the LED driver takes integer PWM levels. These helpers convert
//! between the two and walk the hue wheel used by the RGB light and the
//! colour phase of sensor calibration.

use crate::config::PWM_PERIOD;
use crate::types::ChannelLevels;
use palette::{FromColor, Hsv, Srgb};

pub const WHITE: Srgb = Srgb::new(1.0, 1.0, 1.0);
pub const RED: Srgb = Srgb::new(1.0, 0.0, 0.0);
pub const GREEN: Srgb = Srgb::new(0.0, 1.0, 0.0);
pub const BLUE: Srgb = Srgb::new(0.0, 0.0, 1.0);
pub const BLACK: Srgb = Srgb::new(0.0, 0.0, 0.0);

/// Creates an RGB color from HSV (Hue, Saturation, Value) components.
#[inline]
pub fn hsv(hue: f32, saturation: f32, value: f32) -> Srgb {
    let hsv = Hsv::new(hue, saturation, value);
    Srgb::from_color(hsv)
}

/// Creates an RGB color from hue only (full saturation and value).
#[inline]
pub fn hue(hue: f32) -> Srgb {
    hsv(hue, 1.0, 1.0)
}

/// Converts a color to PWM levels, rounding to the nearest step.
pub fn to_levels(color: Srgb) -> ChannelLevels {
    let channel = |c: f32| {
        let scaled = c.clamp(0.0, 1.0) * PWM_PERIOD as f32 + 0.5;
        scaled as u16
    };
    ChannelLevels::new(channel(color.red), channel(color.green), channel(color.blue))
}

/// Converts PWM levels back to a color.
pub fn from_levels(levels: ChannelLevels) -> Srgb {
    let channel = |c: u16| c as f32 / PWM_PERIOD as f32;
    Srgb::new(channel(levels.red), channel(levels.green), channel(levels.blue))
}

/// PWM levels for position `step` of a hue wheel split into `steps` equal slices.
pub fn hue_wheel_levels(step: usize, steps: usize) -> ChannelLevels {
    if steps == 0 {
        return to_levels(RED);
    }
    let degrees = (step % steps) as f32 * 360.0 / steps as f32;
    to_levels(hue(degrees))
}
