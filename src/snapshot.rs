//! Byte codec for [`DeviceState`].
//!
//! A host tool or a flash layer can persist the state with
//! [`DeviceState::serialize`] and bring it back with
//! [`DeviceState::deserialize`]. Restoring a decoded snapshot with
//! [`NightLight::restore`](crate::NightLight::restore) resumes exactly where
//! the snapshot was taken.
//!
//! Layout (little-endian, fixed size [`SNAPSHOT_LEN`]):
//!   - `[0]` format version
//!   - `[1..8]` current state, previous state, colour mode, pot substate,
//!     LED substate, sensor phase (0 when idle), sensor step
//!   - `[8..11]` pot, LED and sensor calibration flags
//!   - 3 pot ranges: `u16` lower, `u16` upper
//!   - `LED_COUNT` dot corrections: `u16` red, green, blue
//!   - brightness, white and colour sensor buffers, `CAL_BUFFER_LEN`
//!     samples each: `u32` mean, `u32` variance

use crate::calibration::{
    CalSample, CalibrationFlag, DotCorrection, LedCalSubstate, PotCalSubstate, PotRange,
    SensorCalBuffers, SensorCalPhase, SensorCalSubstate,
};
use crate::config::{CAL_BUFFER_LEN, LED_COUNT};
use crate::machine::DeviceState;
use crate::types::{ColourMode, OperatingState};

/// Format version written into byte 0.
pub const SNAPSHOT_VERSION: u8 = 1;

const HEADER_LEN: usize = 11;
const POT_RANGE_LEN: usize = 4;
const DOT_CORRECTION_LEN: usize = 6;
const SAMPLE_LEN: usize = 8;

/// Serialized size of a [`DeviceState`].
pub const SNAPSHOT_LEN: usize = HEADER_LEN
    + 3 * POT_RANGE_LEN
    + LED_COUNT * DOT_CORRECTION_LEN
    + 3 * CAL_BUFFER_LEN * SAMPLE_LEN;

/// Errors that can occur while decoding a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SnapshotError {
    /// Input shorter than [`SNAPSHOT_LEN`].
    TooShort { needed: usize, actual: usize },
    /// Byte 0 names a format this build does not read.
    UnsupportedVersion(u8),
    /// The byte at `offset` is not a valid code for its field.
    InvalidField { offset: usize, value: u8 },
}

impl core::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SnapshotError::TooShort { needed, actual } => {
                write!(f, "snapshot too short: need {} bytes, got {}", needed, actual)
            }
            SnapshotError::UnsupportedVersion(version) => {
                write!(f, "unsupported snapshot version {}", version)
            }
            SnapshotError::InvalidField { offset, value } => {
                write!(f, "invalid value {} at snapshot offset {}", value, offset)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SnapshotError {}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    fn u16(&mut self, value: u16) {
        self.put(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    /// Reads a code byte and decodes it, reporting its offset on failure.
    fn code<T>(&mut self, decode: impl FnOnce(u8) -> Option<T>) -> Result<T, SnapshotError> {
        let offset = self.pos;
        let value = self.u8();
        decode(value).ok_or(SnapshotError::InvalidField { offset, value })
    }
}

fn colour_mode_from_u8(value: u8) -> Option<ColourMode> {
    match value {
        0 => Some(ColourMode::White),
        1 => Some(ColourMode::Rgb),
        _ => None,
    }
}

fn colour_mode_to_u8(mode: ColourMode) -> u8 {
    match mode {
        ColourMode::White => 0,
        ColourMode::Rgb => 1,
    }
}

impl DeviceState {
    /// Writes the state into `buf` and returns the number of bytes written,
    /// or 0 when `buf` is shorter than [`SNAPSHOT_LEN`].
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < SNAPSHOT_LEN {
            return 0;
        }
        let mut w = Writer { buf, pos: 0 };

        w.u8(SNAPSHOT_VERSION);
        w.u8(self.current_state.to_u8());
        w.u8(self.previous_state.to_u8());
        w.u8(colour_mode_to_u8(self.colour_mode));
        w.u8(self.pot_substate.to_u8());
        w.u8(self.led_substate.to_u8());
        match self.sensor_substate {
            SensorCalSubstate::Idle => {
                w.u8(0);
                w.u8(0);
            }
            SensorCalSubstate::Capturing { phase, step } => {
                w.u8(phase.to_u8());
                w.u8(step);
            }
        }
        w.u8(self.flags.pot.to_u8());
        w.u8(self.flags.led.to_u8());
        w.u8(self.flags.sensor.to_u8());

        for range in &self.pot_ranges {
            w.u16(range.lower);
            w.u16(range.upper);
        }
        for row in &self.dot_corrections {
            w.u16(row.red);
            w.u16(row.green);
            w.u16(row.blue);
        }
        for phase in SensorCalPhase::ALL {
            for sample in self.sensor_buffers.phase(phase) {
                w.u32(sample.mean);
                w.u32(sample.variance);
            }
        }

        w.pos
    }

    /// Decodes a state written by [`serialize`](Self::serialize).
    ///
    /// Bytes beyond [`SNAPSHOT_LEN`] are ignored.
    pub fn deserialize(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < SNAPSHOT_LEN {
            return Err(SnapshotError::TooShort {
                needed: SNAPSHOT_LEN,
                actual: data.len(),
            });
        }
        let mut r = Reader { data, pos: 0 };

        let version = r.u8();
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version));
        }

        let current_state = r.code(OperatingState::from_u8)?;
        let previous_state = r.code(OperatingState::from_u8)?;
        let colour_mode = r.code(colour_mode_from_u8)?;
        let pot_substate = r.code(PotCalSubstate::from_u8)?;
        let led_substate = r.code(LedCalSubstate::from_u8)?;
        let phase = r.code(|v| match v {
            0 => Some(None),
            other => SensorCalPhase::from_u8(other).map(Some),
        })?;
        let step = r.u8();
        let sensor_substate = match phase {
            None => SensorCalSubstate::Idle,
            Some(phase) => SensorCalSubstate::Capturing { phase, step },
        };

        let mut state = DeviceState {
            current_state,
            previous_state,
            colour_mode,
            pot_substate,
            led_substate,
            sensor_substate,
            ..DeviceState::INITIAL
        };
        state.flags.pot = r.code(CalibrationFlag::from_u8)?;
        state.flags.led = r.code(CalibrationFlag::from_u8)?;
        state.flags.sensor = r.code(CalibrationFlag::from_u8)?;

        for range in state.pot_ranges.iter_mut() {
            *range = PotRange {
                lower: r.u16(),
                upper: r.u16(),
            };
        }
        for row in state.dot_corrections.iter_mut() {
            *row = DotCorrection {
                red: r.u16(),
                green: r.u16(),
                blue: r.u16(),
            };
        }
        let mut buffers = SensorCalBuffers::EMPTY;
        for phase in SensorCalPhase::ALL {
            for sample in buffers.phase_mut(phase).iter_mut() {
                *sample = CalSample {
                    mean: r.u32(),
                    variance: r.u32(),
                };
            }
        }
        state.sensor_buffers = buffers;

        Ok(state)
    }
}
