//! Calibration engine.
//!
//! Three independent calibrations share one status model:
//!
//! - **Potentiometer** ([`pot`]): six captures of pot end stops, stepped by
//!   button presses.
//! - **LED dot correction** ([`led`]): one RGB capture per LED, stepped by
//!   button presses.
//! - **Ambient light sensor** ([`sensor`]): a blocking three-phase run with
//!   the statistical sampling protocol in [`stats`], retries and abort.
//!
//! The steppers are pure `(substate, event) -> (substate, action)` functions;
//! [`NightLight`](crate::NightLight) interprets their actions against the
//! hardware.

pub mod led;
pub mod pot;
pub mod sensor;
pub mod stats;

pub use led::{DotCorrection, LedCalAction, LedCalSubstate};
pub use pot::{Bound, PotCalAction, PotCalSubstate, PotRange};
pub use sensor::{SensorCalBuffers, SensorCalPhase, SensorCalSubstate};
pub use stats::CalSample;

/// Progress of one calibration kind, as seen by whatever persists results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationFlag {
    /// No run since power-up.
    #[default]
    Idle,
    /// A run is active.
    InProgress,
    /// The last run completed; its buffer holds fresh data.
    DataReady,
    /// The last run was aborted; its buffer holds no usable data.
    Aborted,
}

impl CalibrationFlag {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            CalibrationFlag::Idle => 0,
            CalibrationFlag::InProgress => 1,
            CalibrationFlag::DataReady => 2,
            CalibrationFlag::Aborted => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CalibrationFlag::Idle),
            1 => Some(CalibrationFlag::InProgress),
            2 => Some(CalibrationFlag::DataReady),
            3 => Some(CalibrationFlag::Aborted),
            _ => None,
        }
    }
}

/// Status flags of the three calibration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationFlags {
    pub pot: CalibrationFlag,
    pub led: CalibrationFlag,
    pub sensor: CalibrationFlag,
}

/// Reasons a sensor calibration step, phase or run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// More samples than the fixed budget would be needed for the required
    /// margin of error; the room is too noisy.
    Unstable {
        /// Estimated sample count needed.
        required: u64,
    },

    /// Leading and trailing baselines of a phase disagree beyond tolerance.
    BaselineDrift {
        /// Mean of the leading baseline.
        first: u32,
        /// Mean of the trailing baseline.
        last: u32,
    },

    /// The sensor bus reported an error while reading.
    SensorFault,

    /// The sensor did not signal a fresh reading in time.
    SensorTimeout,

    /// The user asked for the run to stop.
    Aborted,

    /// A phase failed on every allowed attempt.
    RetriesExhausted {
        /// Phase that could not be completed.
        phase: SensorCalPhase,
    },
}

impl CalibrationError {
    /// True for failures that a fresh attempt of the same phase may fix.
    #[inline]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            CalibrationError::Unstable { .. }
                | CalibrationError::BaselineDrift { .. }
                | CalibrationError::SensorFault
        )
    }
}

impl core::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CalibrationError::Unstable { required } => {
                write!(
                    f,
                    "ambient light too noisy: {} samples required for the margin of error",
                    required
                )
            }
            CalibrationError::BaselineDrift { first, last } => {
                write!(
                    f,
                    "ambient baseline drifted from {} mlux to {} mlux during the phase",
                    first, last
                )
            }
            CalibrationError::SensorFault => write!(f, "ambient light sensor read failed"),
            CalibrationError::SensorTimeout => {
                write!(f, "ambient light sensor did not produce a reading in time")
            }
            CalibrationError::Aborted => write!(f, "calibration aborted by user"),
            CalibrationError::RetriesExhausted { phase } => {
                write!(f, "{:?} phase failed on every attempt", phase)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CalibrationError {}
