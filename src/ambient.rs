//! Ambient light threshold crossings.
//!
//! The sensor delivers milli-lux readings on its own ready signal. A
//! reading below the lower hysteresis threshold turns a standby light on;
//! one above the upper threshold turns a lit light off. Readings inside the
//! band, or in any other mode, raise nothing.

use crate::event::EventType;
use crate::types::OperatingState;

/// Lower and upper hysteresis thresholds in milli-lux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Thresholds {
    pub low: u32,
    pub high: u32,
}

impl Thresholds {
    /// Creates thresholds, swapping the bounds if given in the wrong order.
    pub fn new(low: u32, high: u32) -> Self {
        if low <= high {
            Self { low, high }
        } else {
            Self { low: high, high: low }
        }
    }
}

/// Event raised by a fresh `lux` reading in `state`, if any.
pub fn check_crossing(lux: u32, thresholds: Thresholds, state: OperatingState) -> Option<EventType> {
    if lux < thresholds.low && state == OperatingState::Standby {
        debug!("ambient: {} mlux below {} mlux, turning on", lux, thresholds.low);
        Some(EventType::AmbientOn)
    } else if lux > thresholds.high && state.is_lit() {
        debug!("ambient: {} mlux above {} mlux, turning off", lux, thresholds.high);
        Some(EventType::AmbientOff)
    } else {
        None
    }
}
