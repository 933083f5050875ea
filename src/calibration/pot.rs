//! Potentiometer end-stop calibration.
//!
//! The user turns each pot to its lower end stop, presses that pot's
//! button, turns it to the upper end stop and presses again. Six captures
//! in all, walked in the order of [`POT_STEPS`]. A hold on the pot 1 button
//! aborts at any point.

use crate::config::ADC_MAX;
use crate::event::EventType;
use crate::types::Pot;

/// Which end stop a capture records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bound {
    Lower,
    Upper,
}

/// Position in the potentiometer calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PotCalSubstate {
    /// Not yet entered.
    #[default]
    Start,
    Pot1Lower,
    Pot1Upper,
    Pot2Lower,
    Pot2Upper,
    Pot3Lower,
    Pot3Upper,
}

/// One capture step: the substate, the press that completes it, and what it
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotStep {
    pub substate: PotCalSubstate,
    pub trigger: EventType,
    pub pot: Pot,
    pub bound: Bound,
}

/// Capture steps in the order they are walked.
pub static POT_STEPS: [PotStep; 6] = [
    PotStep {
        substate: PotCalSubstate::Pot1Lower,
        trigger: EventType::Pot1Press,
        pot: Pot::Brightness,
        bound: Bound::Lower,
    },
    PotStep {
        substate: PotCalSubstate::Pot1Upper,
        trigger: EventType::Pot1Press,
        pot: Pot::Brightness,
        bound: Bound::Upper,
    },
    PotStep {
        substate: PotCalSubstate::Pot2Lower,
        trigger: EventType::Pot2Press,
        pot: Pot::Colour,
        bound: Bound::Lower,
    },
    PotStep {
        substate: PotCalSubstate::Pot2Upper,
        trigger: EventType::Pot2Press,
        pot: Pot::Colour,
        bound: Bound::Upper,
    },
    PotStep {
        substate: PotCalSubstate::Pot3Lower,
        trigger: EventType::Pot3Press,
        pot: Pot::Sensitivity,
        bound: Bound::Lower,
    },
    PotStep {
        substate: PotCalSubstate::Pot3Upper,
        trigger: EventType::Pot3Press,
        pot: Pot::Sensitivity,
        bound: Bound::Upper,
    },
];

/// Event that aborts the potentiometer calibration.
pub const POT_CAL_ABORT: EventType = EventType::Pot1Hold;

impl PotCalSubstate {
    /// Table entry for this substate; `None` for `Start`.
    pub fn step(self) -> Option<&'static PotStep> {
        POT_STEPS.iter().find(|s| s.substate == self)
    }

    /// Pot being calibrated in this substate.
    pub fn pot(self) -> Option<Pot> {
        self.step().map(|s| s.pot)
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            PotCalSubstate::Start => 0,
            PotCalSubstate::Pot1Lower => 1,
            PotCalSubstate::Pot1Upper => 2,
            PotCalSubstate::Pot2Lower => 3,
            PotCalSubstate::Pot2Upper => 4,
            PotCalSubstate::Pot3Lower => 5,
            PotCalSubstate::Pot3Upper => 6,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PotCalSubstate::Start),
            other => POT_STEPS.get(other as usize - 1).map(|s| s.substate),
        }
    }
}

/// Side effect requested by one step of the stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PotCalAction {
    /// Event does nothing in this substate.
    Ignore,
    /// Calibration entered; announce it and show the cue for pot 1.
    Begin,
    /// Record `bound` of `pot` and show the cue for the next pot.
    Capture { pot: Pot, bound: Bound },
    /// Record the final capture and finish the calibration.
    Finish { pot: Pot, bound: Bound },
    /// Discard the captures and leave the calibration.
    Abort,
}

/// Advances the potentiometer calibration by one event.
pub fn step(substate: PotCalSubstate, event: EventType) -> (PotCalSubstate, PotCalAction) {
    let Some(index) = POT_STEPS.iter().position(|s| s.substate == substate) else {
        // Start: the triggering hold enters the first capture step.
        return (POT_STEPS[0].substate, PotCalAction::Begin);
    };

    if event == POT_CAL_ABORT {
        return (PotCalSubstate::Start, PotCalAction::Abort);
    }

    let current = &POT_STEPS[index];
    if event != current.trigger {
        return (substate, PotCalAction::Ignore);
    }

    match POT_STEPS.get(index + 1) {
        Some(next) => (
            next.substate,
            PotCalAction::Capture {
                pot: current.pot,
                bound: current.bound,
            },
        ),
        None => (
            PotCalSubstate::Start,
            PotCalAction::Finish {
                pot: current.pot,
                bound: current.bound,
            },
        ),
    }
}

/// Raw ADC readings at a pot's end stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PotRange {
    pub lower: u16,
    pub upper: u16,
}

impl PotRange {
    /// The whole converter range, used until a calibration succeeds.
    pub const FULL: Self = Self {
        lower: 0,
        upper: ADC_MAX,
    };

    /// Stores one end stop. After an upper capture a range that is empty or
    /// inverted falls back to the full converter range.
    pub fn record(&mut self, bound: Bound, raw: u16) {
        match bound {
            Bound::Lower => self.lower = raw,
            Bound::Upper => {
                if raw > self.lower {
                    self.upper = raw;
                } else {
                    warn!(
                        "pot calibration: upper {} not above lower {}, using full range",
                        raw, self.lower
                    );
                    *self = Self::FULL;
                }
            }
        }
    }

    /// Maps a raw reading into `0..=ADC_MAX` across the calibrated range.
    pub fn scale(&self, raw: u16) -> u16 {
        if self.upper <= self.lower {
            return raw.min(ADC_MAX);
        }
        let clamped = raw.clamp(self.lower, self.upper);
        let span = (self.upper - self.lower) as u32;
        (((clamped - self.lower) as u32 * ADC_MAX as u32) / span) as u16
    }
}

impl Default for PotRange {
    fn default() -> Self {
        Self::FULL
    }
}
