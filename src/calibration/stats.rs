//! Sample statistics for ambient sensor calibration.
//!
//! A calibration sample is the mean of `NUM_CAL_SAMPLES` fresh lux readings.
//! It is only kept when the spread of those readings is small enough that
//! the fixed sample count reaches the margin of error: the estimated sample
//! size `z² σ² / margin²` must stay below `NUM_CAL_SAMPLES`, with
//! `margin = mean / MARGIN_DIVISOR`. All arithmetic is integer; the mean is
//! truncated.

use super::CalibrationError;
use crate::config::{DRIFT_DIVISOR, MARGIN_DIVISOR, NUM_CAL_SAMPLES, Z_SCORE};

/// Mean and sample variance of one batch of lux readings (milli-lux).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalSample {
    pub mean: u32,
    pub variance: u32,
}

impl CalSample {
    /// Mean and sample variance (`n - 1` denominator) of `readings`.
    ///
    /// Returns the default sample for an empty slice and zero variance for a
    /// single reading.
    pub fn from_readings(readings: &[u32]) -> Self {
        Spread::of(readings).sample()
    }

    /// Allowed error on the mean: `mean / MARGIN_DIVISOR`.
    #[inline]
    pub fn margin(&self) -> u32 {
        self.mean / MARGIN_DIVISOR
    }
}

/// Sums behind one sample, kept before the variance is divided down.
struct Spread {
    mean: u64,
    /// Sum of squared deviations from the truncated mean.
    squares: u64,
    /// Degrees of freedom, `n - 1`.
    dof: u64,
}

impl Spread {
    fn of(readings: &[u32]) -> Self {
        let n = readings.len() as u64;
        if n == 0 {
            return Self {
                mean: 0,
                squares: 0,
                dof: 0,
            };
        }
        let sum: u64 = readings.iter().map(|&r| r as u64).sum();
        let mean = sum / n;
        let squares = readings
            .iter()
            .map(|&r| {
                let d = (r as u64).abs_diff(mean);
                d.saturating_mul(d)
            })
            .fold(0u64, u64::saturating_add);

        Self {
            mean,
            squares,
            dof: n - 1,
        }
    }

    fn sample(&self) -> CalSample {
        let variance = if self.dof == 0 {
            0
        } else {
            self.squares / self.dof
        };
        CalSample {
            mean: self.mean.min(u32::MAX as u64) as u32,
            variance: variance.min(u32::MAX as u64) as u32,
        }
    }

    fn margin(&self) -> u64 {
        self.mean / MARGIN_DIVISOR as u64
    }

    /// Estimated number of readings needed to reach the margin of error,
    /// `z² σ² / margin²` with `σ² = squares / dof`.
    ///
    /// No spread needs no readings; a spread around a mean too small to have
    /// a margin can never be reached (`u64::MAX`).
    fn required_samples(&self) -> u64 {
        if self.squares == 0 {
            return 0;
        }
        let margin = self.margin() as u128;
        if margin == 0 {
            return u64::MAX;
        }
        let required = (Z_SCORE * Z_SCORE) as u128 * self.squares as u128
            / (self.dof as u128 * margin * margin);
        required.min(u64::MAX as u128) as u64
    }

    /// `z² σ² / margin² < NUM_CAL_SAMPLES`, multiplied through by
    /// `dof · margin²` so no division truncates.
    fn is_stable(&self) -> bool {
        if self.squares == 0 {
            return true;
        }
        let margin = self.margin() as u128;
        let lhs = (Z_SCORE * Z_SCORE) as u128 * self.squares as u128;
        let rhs = NUM_CAL_SAMPLES as u128 * self.dof as u128 * margin * margin;
        lhs < rhs
    }
}

/// Mean and variance of `readings`, rejected when they are too noisy.
pub fn evaluate(readings: &[u32]) -> Result<CalSample, CalibrationError> {
    let spread = Spread::of(readings);
    if spread.is_stable() {
        Ok(spread.sample())
    } else {
        Err(CalibrationError::Unstable {
            required: spread.required_samples(),
        })
    }
}

/// Checks that the trailing baseline of a phase stayed within
/// `first / DRIFT_DIVISOR` of the leading one.
pub fn check_drift(first: &CalSample, last: &CalSample) -> Result<(), CalibrationError> {
    let tolerance = first.mean / DRIFT_DIVISOR;
    if first.mean.abs_diff(last.mean) <= tolerance {
        Ok(())
    } else {
        Err(CalibrationError::BaselineDrift {
            first: first.mean,
            last: last.mean,
        })
    }
}
