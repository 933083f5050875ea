//! Core types shared by the state machine, calibration engine and
//! collaborator traits.

use crate::config::{ADC_MAX, LED_COUNT, PWM_PERIOD};

/// Operating mode of the night light.
///
/// Exactly one mode is live at a time. Only the state machine changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingState {
    /// Light off, room is bright enough.
    Standby,

    /// Light on, white spectrum selected by colour temperature.
    WhiteLight,

    /// Light on, colour selected from the hue wheel.
    RgbLight,

    /// Capturing potentiometer end stops.
    PotCalibration,

    /// Capturing per-LED dot correction.
    LedCalibration,

    /// Characterising the ambient light sensor.
    AmbientCalibration,
}

impl OperatingState {
    /// True for the two modes in which the LEDs are lit for the user.
    #[inline]
    pub fn is_lit(self) -> bool {
        matches!(self, OperatingState::WhiteLight | OperatingState::RgbLight)
    }

    /// True for any of the three calibration modes.
    #[inline]
    pub fn is_calibrating(self) -> bool {
        matches!(
            self,
            OperatingState::PotCalibration
                | OperatingState::LedCalibration
                | OperatingState::AmbientCalibration
        )
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            OperatingState::Standby => 0,
            OperatingState::WhiteLight => 1,
            OperatingState::RgbLight => 2,
            OperatingState::PotCalibration => 3,
            OperatingState::LedCalibration => 4,
            OperatingState::AmbientCalibration => 5,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OperatingState::Standby),
            1 => Some(OperatingState::WhiteLight),
            2 => Some(OperatingState::RgbLight),
            3 => Some(OperatingState::PotCalibration),
            4 => Some(OperatingState::LedCalibration),
            5 => Some(OperatingState::AmbientCalibration),
            _ => None,
        }
    }
}

/// Persistent colour preference, consulted when ambient light turns the
/// device on from standby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColourMode {
    #[default]
    White,
    Rgb,
}

impl ColourMode {
    /// The operating state this preference lights the device in.
    #[inline]
    pub fn state(self) -> OperatingState {
        match self {
            ColourMode::White => OperatingState::WhiteLight,
            ColourMode::Rgb => OperatingState::RgbLight,
        }
    }
}

/// One of the three potentiometers (each with its own push button).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pot {
    /// Pot 1, brightness.
    Brightness,
    /// Pot 2, colour or colour temperature.
    Colour,
    /// Pot 3, ambient sensitivity.
    Sensitivity,
}

impl Pot {
    pub const ALL: [Pot; 3] = [Pot::Brightness, Pot::Colour, Pot::Sensitivity];

    /// Zero-based index, matching the button index.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Pot::Brightness => 0,
            Pot::Colour => 1,
            Pot::Sensitivity => 2,
        }
    }
}

/// PWM compare values for the three colour channels, each `0..=PWM_PERIOD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelLevels {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl ChannelLevels {
    pub const OFF: Self = Self::new(0, 0, 0);
    pub const FULL: Self = Self::new(PWM_PERIOD, PWM_PERIOD, PWM_PERIOD);

    /// Creates levels, clamping each channel to `PWM_PERIOD`.
    #[inline]
    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        const fn clamp(value: u16) -> u16 {
            if value > PWM_PERIOD { PWM_PERIOD } else { value }
        }
        Self {
            red: clamp(red),
            green: clamp(green),
            blue: clamp(blue),
        }
    }

    /// All three channels at the same level.
    #[inline]
    pub const fn grey(level: u16) -> Self {
        Self::new(level, level, level)
    }

    /// Scales every channel by `numerator / PWM_PERIOD`.
    pub fn dimmed(self, numerator: u16) -> Self {
        let n = numerator.min(PWM_PERIOD) as u32;
        let scale = |c: u16| ((c as u32 * n) / PWM_PERIOD as u32) as u16;
        Self::new(scale(self.red), scale(self.green), scale(self.blue))
    }
}

/// Per-LED on/off mask for the current driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedMask(pub [bool; LED_COUNT]);

impl LedMask {
    pub const ALL_ON: Self = LedMask([true; LED_COUNT]);

    /// Only the LED at zero-based `index` is on.
    pub fn single(index: usize) -> Self {
        let mut mask = [false; LED_COUNT];
        if let Some(slot) = mask.get_mut(index) {
            *slot = true;
        }
        LedMask(mask)
    }
}

/// Linear map of a `0..=ADC_MAX` reading onto `0..=span`.
#[inline]
pub(crate) fn adc_to_span(value: u16, span: u32) -> u32 {
    (value.min(ADC_MAX) as u32 * span) / ADC_MAX as u32
}
