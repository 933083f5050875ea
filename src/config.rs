//! Compile-time constants shared by the event source, state machine and
//! calibration engine.
//!
//! Timing values are in milliseconds. Channel levels are PWM compare values
//! in `0..=PWM_PERIOD`.

// Buttons

/// Edges closer than this to the previous accepted transition are bounce.
pub const DEBOUNCE_MS: u64 = 50;

/// Releases at or beyond this press duration are holds, not presses.
pub const HOLD_THRESHOLD_MS: u64 = 5000;

/// Number of potentiometer push buttons.
pub const BUTTON_COUNT: usize = 3;

// Actuation

/// Timer counter period; a channel level of `PWM_PERIOD` is fully on.
pub const PWM_PERIOD: u16 = 1000;

/// Number of tri-colour LEDs behind the current driver.
pub const LED_COUNT: usize = 16;

/// Full-scale raw ADC reading (12-bit converter).
pub const ADC_MAX: u16 = 4095;

/// Lowest colour temperature swept by the white light and its calibration.
pub const KELVIN_MIN: u32 = 1000;

/// Highest colour temperature swept by the white light and its calibration.
pub const KELVIN_MAX: u32 = 8000;

// Feedback pulses

/// Length of each on/off frame of a short pulse.
pub const PULSE_FRAME_MS: u32 = 150;

/// Dark gap in the middle of a long pulse.
pub const LONG_PULSE_GAP_MS: u32 = 1000;

/// Pause between the final capture of a calibration and its completion pulses.
pub const COMPLETION_PAUSE_MS: u32 = 1000;

// Ambient light sensor calibration

/// Actuator increments swept per calibration phase. Must be a multiple of 6
/// so the hue wheel divides evenly into its six colour segments.
pub const NUM_CAL_INCS: usize = 24;

const _: () = assert!(NUM_CAL_INCS % 6 == 0 && NUM_CAL_INCS > 0);

/// Entries in one phase buffer: leading baseline, up to `NUM_CAL_INCS + 1`
/// increments and trailing baseline.
pub const CAL_BUFFER_LEN: usize = NUM_CAL_INCS + 3;

/// Fresh lux readings averaged into one calibration sample.
pub const NUM_CAL_SAMPLES: usize = 10;

/// Margin of error is `mean / MARGIN_DIVISOR` (2% of the mean).
pub const MARGIN_DIVISOR: u32 = 50;

/// z-score of the required-sample-size estimate.
pub const Z_SCORE: u64 = 2;

/// Leading and trailing baselines may differ by at most `mean / DRIFT_DIVISOR`.
pub const DRIFT_DIVISOR: u32 = 50;

/// Attempts per calibration phase before the whole run is aborted.
pub const MAX_PHASE_ATTEMPTS: u8 = 5;

/// Interval between polls of the sensor's ready signal.
pub const SENSOR_POLL_INTERVAL_MS: u32 = 1;

/// Longest wait for a single sensor conversion before the run is aborted.
pub const SENSOR_TIMEOUT_MS: u32 = 1000;
