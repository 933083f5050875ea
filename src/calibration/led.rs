//! LED dot-correction calibration.
//!
//! LEDs are lit one at a time. While LED `i` is lit the user matches its
//! colour with the three pots and presses the pot 2 button; the raw pot
//! readings become row `i` of the dot-correction buffer. A hold aborts the
//! same way it aborts the pot calibration (pot 1 button); the hold that
//! entered the mode (pot 2 button) aborts as well.

use super::pot::POT_CAL_ABORT;
use crate::config::LED_COUNT;
use crate::event::EventType;

/// Number of LEDs walked, as the last substate index.
const LAST_LED: u8 = LED_COUNT as u8;

/// Event that captures the lit LED.
pub const LED_CAL_CAPTURE: EventType = EventType::Pot2Press;

/// Events that abort the LED calibration.
pub const LED_CAL_ABORT: [EventType; 2] = [POT_CAL_ABORT, EventType::Pot2Hold];

/// Position in the LED calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedCalSubstate {
    /// Not yet entered.
    #[default]
    Start,
    /// LED `n` (1-based, `1..=LED_COUNT`) is lit and awaiting capture.
    ///
    /// Any other `n` is treated as not yet entered.
    Led(u8),
}

impl LedCalSubstate {
    /// Zero-based index of the lit LED.
    #[inline]
    pub fn led_index(self) -> Option<usize> {
        match self {
            LedCalSubstate::Led(n) if (1..=LAST_LED).contains(&n) => Some(n as usize - 1),
            _ => None,
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            LedCalSubstate::Start => 0,
            LedCalSubstate::Led(n) => n,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LedCalSubstate::Start),
            n if n <= LAST_LED => Some(LedCalSubstate::Led(n)),
            _ => None,
        }
    }
}

/// Raw pot readings matched to one LED, one per colour channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DotCorrection {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

/// Side effect requested by one step of the stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedCalAction {
    Ignore,
    /// Calibration entered; announce it and light LED `index` alone.
    Begin { index: usize },
    /// Store the pots in row `index` and light LED `next` alone.
    Capture { index: usize, next: usize },
    /// Store the pots in row `index`, light every LED and finish.
    Finish { index: usize },
    /// Discard the captures, light every LED and leave the calibration.
    Abort,
}

/// Advances the LED calibration by one event.
pub fn step(substate: LedCalSubstate, event: EventType) -> (LedCalSubstate, LedCalAction) {
    let Some(index) = substate.led_index() else {
        return (LedCalSubstate::Led(1), LedCalAction::Begin { index: 0 });
    };
    let n = index as u8 + 1;

    match event {
        e if LED_CAL_ABORT.contains(&e) => (LedCalSubstate::Start, LedCalAction::Abort),
        LED_CAL_CAPTURE if n == LAST_LED => (
            LedCalSubstate::Start,
            LedCalAction::Finish { index },
        ),
        LED_CAL_CAPTURE => (
            LedCalSubstate::Led(n + 1),
            LedCalAction::Capture {
                index,
                next: index + 1,
            },
        ),
        _ => (substate, LedCalAction::Ignore),
    }
}
