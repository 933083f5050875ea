#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`EventSource`**: Debounces the three pot buttons and classifies releases as presses or holds
//! - **`EventMailbox`**: Single-slot, lock-free hand-off of events from interrupt contexts
//! - **`NightLight`**: Driver-loop state machine owning the device state and the board
//! - **`DeviceState`**: Every mode, substate, flag and calibration buffer, as one `Copy` value
//! - **`Actuator`**, **`PotSampler`**, **`AmbientSensor`**, **`ColourModel`**: Traits to implement for your hardware
//! - **`TimeSource`**: Trait to implement for your timing system
//!
//! Channel levels are integer PWM compare values in `0..=PWM_PERIOD`. Feedback
//! pulses and the hue wheel are computed with `Srgb<f32>` and converted with
//! the helpers in [`colors`].

// Must come first so the logging macros are visible in every module.
#[macro_use]
mod fmt;

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

pub mod ambient;
pub mod button;
pub mod calibration;
pub mod colors;
pub mod config;
pub mod event;
pub mod feedback;
pub mod hal;
pub mod machine;
pub mod snapshot;
pub mod time;
pub mod types;

pub use ambient::{Thresholds, check_crossing};
pub use button::{ButtonError, ButtonState, EventSource};
pub use calibration::{
    CalSample, CalibrationError, CalibrationFlag, CalibrationFlags, DotCorrection,
    LedCalSubstate, PotCalSubstate, PotRange, SensorCalBuffers, SensorCalPhase,
    SensorCalSubstate,
};
pub use event::{EventMailbox, EventType};
pub use feedback::{Pulse, Tint};
pub use hal::{Actuator, AmbientSensor, Board, ColourModel, PotSampler};
pub use machine::{DeviceState, NightLight, Transition};
pub use snapshot::{SNAPSHOT_LEN, SnapshotError};
pub use time::{TimeDuration, TimeInstant, TimeSource};
pub use types::{ChannelLevels, ColourMode, LedMask, OperatingState, Pot};
