//! Operating state machine.
//!
//! Provides [`NightLight`], the driver-loop object that owns the device
//! state and the board peripherals, and the [`TRANSITIONS`] table it
//! interprets. Events come from the [`EventMailbox`] filled by interrupt
//! contexts.
//!
//! Outside calibration the table decides what an event does:
//!
//! | State | Pot1Press | Pot2Press | Pot1Hold | Pot2Hold | Pot3Hold | Ambient |
//! |---|---|---|---|---|---|---|
//! | Standby | | | pot cal | LED cal | sensor cal | On: light in colour mode |
//! | WhiteLight | RgbLight | | pot cal | LED cal | sensor cal | Off: Standby |
//! | RgbLight | | WhiteLight | pot cal | LED cal | sensor cal | Off: Standby |
//!
//! Pairs not listed are ignored. In `PotCalibration` and `LedCalibration`
//! every event goes to the matching substate stepper; completion or abort
//! returns to the state the calibration was entered from.

use crate::calibration::{
    CalibrationFlag, CalibrationFlags, DotCorrection, LedCalAction, LedCalSubstate,
    PotCalAction, PotCalSubstate, PotRange, SensorCalBuffers, SensorCalSubstate,
};
use crate::calibration::{led, pot, sensor};
use crate::colors;
use crate::config::{ADC_MAX, COMPLETION_PAUSE_MS, KELVIN_MAX, KELVIN_MIN, LED_COUNT, PWM_PERIOD};
use crate::event::{EventMailbox, EventType};
use crate::feedback::{Pulse, Tint};
use crate::hal::{Actuator, AmbientSensor, Board, ColourModel, PotSampler};
use crate::types::{ChannelLevels, ColourMode, LedMask, OperatingState, Pot, adc_to_span};
use crate::ambient;
use embedded_hal::delay::DelayNs;

/// What an event does in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// No entry for this (state, event) pair.
    Ignore,
    /// Store the colour preference and light the device in it.
    SetColourMode(ColourMode),
    /// Light the device in the stored colour preference.
    TurnOn,
    /// Go to standby.
    TurnOff,
    EnterPotCal,
    EnterLedCal,
    /// Run the blocking sensor calibration.
    RunSensorCal,
    /// Feed the event to the potentiometer calibration stepper.
    StepPotCal,
    /// Feed the event to the LED calibration stepper.
    StepLedCal,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub from: OperatingState,
    pub on: EventType,
    pub then: Transition,
}

const fn rule(from: OperatingState, on: EventType, then: Transition) -> Rule {
    Rule { from, on, then }
}

/// Transitions out of the three user modes.
pub const TRANSITIONS: [Rule; 14] = {
    use EventType::*;
    use OperatingState::*;
    use Transition::*;
    [
        rule(Standby, Pot1Hold, EnterPotCal),
        rule(Standby, Pot2Hold, EnterLedCal),
        rule(Standby, Pot3Hold, RunSensorCal),
        rule(Standby, AmbientOn, TurnOn),
        rule(WhiteLight, Pot1Press, SetColourMode(ColourMode::Rgb)),
        rule(WhiteLight, Pot1Hold, EnterPotCal),
        rule(WhiteLight, Pot2Hold, EnterLedCal),
        rule(WhiteLight, Pot3Hold, RunSensorCal),
        rule(WhiteLight, AmbientOff, TurnOff),
        rule(RgbLight, Pot2Press, SetColourMode(ColourMode::White)),
        rule(RgbLight, Pot1Hold, EnterPotCal),
        rule(RgbLight, Pot2Hold, EnterLedCal),
        rule(RgbLight, Pot3Hold, RunSensorCal),
        rule(RgbLight, AmbientOff, TurnOff),
    ]
};

/// Looks up what `event` does in `state`.
pub fn lookup(state: OperatingState, event: EventType) -> Transition {
    match state {
        OperatingState::PotCalibration => Transition::StepPotCal,
        OperatingState::LedCalibration => Transition::StepLedCal,
        _ => TRANSITIONS
            .iter()
            .find(|r| r.from == state && r.on == event)
            .map_or(Transition::Ignore, |r| r.then),
    }
}

/// Everything the state machine and the calibration engine remember.
///
/// Fixed size and `Copy`; [`NightLight::snapshot`] hands out a copy and the
/// snapshot codec turns it into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    pub current_state: OperatingState,
    /// State a running calibration returns to.
    pub previous_state: OperatingState,
    pub colour_mode: ColourMode,
    pub pot_substate: PotCalSubstate,
    pub led_substate: LedCalSubstate,
    pub sensor_substate: SensorCalSubstate,
    pub flags: CalibrationFlags,
    /// End stops of each pot, indexed by [`Pot::index`].
    pub pot_ranges: [PotRange; 3],
    pub dot_corrections: [DotCorrection; LED_COUNT],
    pub sensor_buffers: SensorCalBuffers,
}

impl DeviceState {
    /// Power-up state: standby, white preference, nothing calibrated.
    pub const INITIAL: Self = Self {
        current_state: OperatingState::Standby,
        previous_state: OperatingState::Standby,
        colour_mode: ColourMode::White,
        pot_substate: PotCalSubstate::Start,
        led_substate: LedCalSubstate::Start,
        sensor_substate: SensorCalSubstate::Idle,
        flags: CalibrationFlags {
            pot: CalibrationFlag::Idle,
            led: CalibrationFlag::Idle,
            sensor: CalibrationFlag::Idle,
        },
        pot_ranges: [PotRange::FULL; 3],
        dot_corrections: [DotCorrection {
            red: 0,
            green: 0,
            blue: 0,
        }; LED_COUNT],
        sensor_buffers: SensorCalBuffers::EMPTY,
    };
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// The night light's driver loop.
///
/// Owns the device state and the board; the only shared piece is the
/// event mailbox, which interrupt contexts post into.
///
/// # Type Parameters
/// * `'m` - Lifetime of the mailbox reference
/// * `A` - LED driver
/// * `P` - Potentiometer sampler
/// * `S` - Ambient light sensor
/// * `C` - Colour model
/// * `D` - Blocking delay used by feedback pulses and sensor polling
pub struct NightLight<'m, A, P, S, C, D> {
    mailbox: &'m EventMailbox,
    board: Board<A, P, S, C, D>,
    state: DeviceState,
}

impl<'m, A, P, S, C, D> NightLight<'m, A, P, S, C, D>
where
    A: Actuator,
    P: PotSampler,
    S: AmbientSensor,
    C: ColourModel,
    D: DelayNs,
{
    /// Creates the driver in standby with every LED enabled and dark.
    pub fn new(mut board: Board<A, P, S, C, D>, mailbox: &'m EventMailbox) -> Self {
        board.leds.configure_leds(LedMask::ALL_ON);
        board.leds.set_channel_levels(ChannelLevels::OFF);

        Self {
            mailbox,
            board,
            state: DeviceState::INITIAL,
        }
    }

    /// Current operating state.
    #[inline]
    pub fn state(&self) -> OperatingState {
        self.state.current_state
    }

    /// Read access to the full device state.
    #[inline]
    pub fn device_state(&self) -> &DeviceState {
        &self.state
    }

    /// Copy of the full device state.
    #[inline]
    pub fn snapshot(&self) -> DeviceState {
        self.state
    }

    /// Replaces the device state and shows the restored mode.
    ///
    /// A sensor calibration cannot be resumed: a state captured during one
    /// is restored as that run aborted, back in the mode it started from.
    pub fn restore(&mut self, state: DeviceState) {
        info!("restore: {:?}", state.current_state);
        self.state = state;
        if self.state.current_state == OperatingState::AmbientCalibration {
            warn!("restore: sensor calibration interrupted");
            self.state.current_state = if self.state.previous_state.is_calibrating() {
                OperatingState::Standby
            } else {
                self.state.previous_state
            };
            if self.state.flags.sensor == CalibrationFlag::InProgress {
                self.state.flags.sensor = CalibrationFlag::Aborted;
                self.state.sensor_buffers = SensorCalBuffers::EMPTY;
            }
            self.state.sensor_substate = SensorCalSubstate::Idle;
        }
        let mask = match self.state.led_substate.led_index() {
            Some(index) if self.state.current_state == OperatingState::LedCalibration => {
                LedMask::single(index)
            }
            _ => LedMask::ALL_ON,
        };
        self.board.leds.configure_leds(mask);
        self.render();
    }

    #[inline]
    pub fn board(&self) -> &Board<A, P, S, C, D> {
        &self.board
    }

    #[inline]
    pub fn board_mut(&mut self) -> &mut Board<A, P, S, C, D> {
        &mut self.board
    }

    /// Takes the pending event, if any, and dispatches it.
    pub fn dispatch_pending(&mut self) -> Option<Transition> {
        self.mailbox.take().map(|event| self.dispatch(event))
    }

    /// Advances the state machine by one event and refreshes the LEDs.
    ///
    /// Blocks for the duration of any feedback pulses, and for the whole
    /// sensor calibration when the event starts one.
    pub fn dispatch(&mut self, event: EventType) -> Transition {
        let from = self.state.current_state;
        let transition = lookup(from, event);

        match transition {
            Transition::Ignore => {
                trace!("{:?}: {:?} ignored", from, event);
            }
            Transition::SetColourMode(mode) => {
                self.state.colour_mode = mode;
                self.enter(mode.state());
            }
            Transition::TurnOn => self.enter(self.state.colour_mode.state()),
            Transition::TurnOff => self.enter(OperatingState::Standby),
            Transition::EnterPotCal => {
                self.begin_calibration(OperatingState::PotCalibration);
                self.step_pot_cal(event);
            }
            Transition::EnterLedCal => {
                self.begin_calibration(OperatingState::LedCalibration);
                self.step_led_cal(event);
            }
            Transition::RunSensorCal => self.run_sensor_cal(),
            Transition::StepPotCal => self.step_pot_cal(event),
            Transition::StepLedCal => self.step_led_cal(event),
        }

        self.render();
        transition
    }

    /// Checks the ambient light sensor and services the mailbox.
    ///
    /// When a fresh reading is ready outside calibration, compares it with
    /// the thresholds for the sensitivity pot and posts any crossing. The
    /// pending event, if any, is then dispatched; otherwise the LEDs are
    /// refreshed from the pots.
    pub fn poll(&mut self) -> Result<Transition, S::Error> {
        let state = self.state.current_state;
        if !state.is_calibrating() && self.board.sensor.light_ready() {
            let lux = self.board.sensor.take_lux_reading()?;
            let sensitivity = self.scaled_pot(Pot::Sensitivity);
            let thresholds = self.board.colour.hysteresis_thresholds(sensitivity);
            if let Some(event) = ambient::check_crossing(lux, thresholds, state) {
                debug!("ambient: {} mlux crossed {:?}", lux, thresholds);
                self.mailbox.post(event);
            }
        }

        match self.dispatch_pending() {
            Some(transition) => Ok(transition),
            None => {
                self.render();
                Ok(Transition::Ignore)
            }
        }
    }

    /// Sets the LED levels the current state shows.
    pub fn render(&mut self) {
        let levels = match self.state.current_state {
            OperatingState::Standby | OperatingState::AmbientCalibration => ChannelLevels::OFF,
            OperatingState::WhiteLight => {
                let colour = self.scaled_pot(Pot::Colour);
                let kelvin = KELVIN_MIN + adc_to_span(colour, KELVIN_MAX - KELVIN_MIN);
                self.board
                    .colour
                    .kelvin_to_pulses(kelvin)
                    .dimmed(self.brightness())
            }
            OperatingState::RgbLight => {
                let colour = self.scaled_pot(Pot::Colour);
                colors::hue_wheel_levels(colour as usize, ADC_MAX as usize + 1)
                    .dimmed(self.brightness())
            }
            OperatingState::LedCalibration => {
                let [red, green, blue] =
                    Pot::ALL.map(|pot| adc_to_span(self.board.pots.pot_raw(pot), PWM_PERIOD as u32) as u16);
                ChannelLevels::new(red, green, blue)
            }
            OperatingState::PotCalibration => match self.state.pot_substate.pot() {
                Some(Pot::Brightness) => ChannelLevels::new(PWM_PERIOD, 0, 0),
                Some(Pot::Colour) => ChannelLevels::new(0, PWM_PERIOD, 0),
                Some(Pot::Sensitivity) => ChannelLevels::new(0, 0, PWM_PERIOD),
                None => ChannelLevels::OFF,
            },
        };
        self.board.leds.set_channel_levels(levels);
    }

    fn scaled_pot(&mut self, pot: Pot) -> u16 {
        let raw = self.board.pots.pot_moving_average(pot);
        self.state.pot_ranges[pot.index()].scale(raw)
    }

    fn brightness(&mut self) -> u16 {
        adc_to_span(self.scaled_pot(Pot::Brightness), PWM_PERIOD as u32) as u16
    }

    fn enter(&mut self, next: OperatingState) {
        info!("state: {:?} -> {:?}", self.state.current_state, next);
        self.state.current_state = next;
    }

    fn begin_calibration(&mut self, mode: OperatingState) {
        self.state.previous_state = self.state.current_state;
        self.enter(mode);
    }

    fn end_calibration(&mut self) {
        self.enter(self.state.previous_state);
    }

    fn complete_calibration(&mut self) {
        self.board.delay.delay_ms(COMPLETION_PAUSE_MS);
        self.board.flash(Pulse::Long, Tint::Normal);
        self.board.flash(Pulse::Double, Tint::Normal);
    }

    fn step_pot_cal(&mut self, event: EventType) {
        let (next, action) = pot::step(self.state.pot_substate, event);
        self.state.pot_substate = next;

        match action {
            PotCalAction::Ignore => {}
            PotCalAction::Begin => {
                self.state.flags.pot = CalibrationFlag::InProgress;
                self.board.flash(Pulse::Double, Tint::Normal);
            }
            PotCalAction::Capture { pot, bound } => {
                self.capture_pot(pot, bound);
                self.board.flash(Pulse::Single, Tint::Normal);
            }
            PotCalAction::Finish { pot, bound } => {
                self.capture_pot(pot, bound);
                self.board.flash(Pulse::Single, Tint::Normal);
                self.complete_calibration();
                self.state.flags.pot = CalibrationFlag::DataReady;
                info!("pot calibration: done {:?}", self.state.pot_ranges);
                self.end_calibration();
            }
            PotCalAction::Abort => {
                self.state.pot_ranges = [PotRange::FULL; 3];
                self.state.flags.pot = CalibrationFlag::Aborted;
                self.board.flash(Pulse::Double, Tint::Red);
                warn!("pot calibration: aborted");
                self.end_calibration();
            }
        }
    }

    fn capture_pot(&mut self, pot: Pot, bound: pot::Bound) {
        let raw = self.board.pots.pot_raw(pot);
        debug!("pot calibration: {:?} {:?} = {}", pot, bound, raw);
        self.state.pot_ranges[pot.index()].record(bound, raw);
    }

    fn step_led_cal(&mut self, event: EventType) {
        let (next, action) = led::step(self.state.led_substate, event);
        self.state.led_substate = next;

        match action {
            LedCalAction::Ignore => {}
            LedCalAction::Begin { index } => {
                self.state.flags.led = CalibrationFlag::InProgress;
                self.board.flash(Pulse::Double, Tint::Normal);
                self.board.leds.configure_leds(LedMask::single(index));
            }
            LedCalAction::Capture { index, next } => {
                self.capture_led(index);
                self.board.flash(Pulse::Single, Tint::Normal);
                self.board.leds.configure_leds(LedMask::single(next));
            }
            LedCalAction::Finish { index } => {
                self.capture_led(index);
                self.board.flash(Pulse::Single, Tint::Normal);
                self.board.leds.configure_leds(LedMask::ALL_ON);
                self.complete_calibration();
                self.state.flags.led = CalibrationFlag::DataReady;
                info!("led calibration: done");
                self.end_calibration();
            }
            LedCalAction::Abort => {
                self.state.dot_corrections = [DotCorrection::default(); LED_COUNT];
                self.state.flags.led = CalibrationFlag::Aborted;
                self.board.leds.configure_leds(LedMask::ALL_ON);
                self.board.flash(Pulse::Double, Tint::Red);
                warn!("led calibration: aborted");
                self.end_calibration();
            }
        }
    }

    fn capture_led(&mut self, index: usize) {
        let [red, green, blue] = Pot::ALL.map(|pot| self.board.pots.pot_raw(pot));
        debug!("led calibration: led {} = ({}, {}, {})", index + 1, red, green, blue);
        if let Some(row) = self.state.dot_corrections.get_mut(index) {
            *row = DotCorrection { red, green, blue };
        }
    }

    fn run_sensor_cal(&mut self) {
        self.begin_calibration(OperatingState::AmbientCalibration);
        self.state.flags.sensor = CalibrationFlag::InProgress;
        self.board.flash(Pulse::Double, Tint::Normal);

        let result = sensor::run(
            &mut self.board,
            self.mailbox,
            &mut self.state.sensor_buffers,
            &mut self.state.sensor_substate,
        );

        match result {
            Ok(()) => {
                self.state.flags.sensor = CalibrationFlag::DataReady;
                self.board.flash(Pulse::Double, Tint::Normal);
                info!("sensor calibration: done");
            }
            Err(err) => {
                warn!("sensor calibration: aborted: {:?}", err);
                self.state.sensor_buffers = SensorCalBuffers::EMPTY;
                self.state.flags.sensor = CalibrationFlag::Aborted;
                self.board.flash(Pulse::Long, Tint::Red);
                self.board.flash(Pulse::Double, Tint::Red);
            }
        }
        self.end_calibration();
    }
}
