//! Integration tests for the NightLight state machine

mod common;
use common::*;

use nightlight_core::config::{ADC_MAX, KELVIN_MIN, PWM_PERIOD};
use nightlight_core::{
    ChannelLevels, ColourMode, ColourModel, EventMailbox, EventType, LedMask, OperatingState, Pot,
    Transition,
};

#[test]
fn starts_dark_in_standby() {
    let mailbox = EventMailbox::new();
    let light = light(&mailbox);

    assert_eq!(light.state(), OperatingState::Standby);
    assert_eq!(light.device_state().colour_mode, ColourMode::White);
    assert_eq!(light.board().leds.last_mask(), Some(LedMask::ALL_ON));
    assert_eq!(light.board().leds.last_levels(), Some(ChannelLevels::OFF));
}

#[test]
fn ambient_on_lights_the_stored_colour_mode() {
    let mailbox = EventMailbox::new();
    let mut light = light(&mailbox);

    assert_eq!(light.dispatch(EventType::AmbientOn), Transition::TurnOn);
    assert_eq!(light.state(), OperatingState::WhiteLight);
}

#[test]
fn presses_switch_colour_mode_and_the_choice_persists() {
    let mailbox = EventMailbox::new();
    let mut light = light(&mailbox);
    light.dispatch(EventType::AmbientOn);

    assert_eq!(
        light.dispatch(EventType::Pot1Press),
        Transition::SetColourMode(ColourMode::Rgb)
    );
    assert_eq!(light.state(), OperatingState::RgbLight);

    assert_eq!(light.dispatch(EventType::AmbientOff), Transition::TurnOff);
    assert_eq!(light.state(), OperatingState::Standby);

    light.dispatch(EventType::AmbientOn);
    assert_eq!(light.state(), OperatingState::RgbLight);

    light.dispatch(EventType::Pot2Press);
    assert_eq!(light.state(), OperatingState::WhiteLight);
    assert_eq!(light.device_state().colour_mode, ColourMode::White);
}

#[test]
fn unlisted_events_change_nothing() {
    let mailbox = EventMailbox::new();
    let mut light = light(&mailbox);

    for event in [
        EventType::Pot1Press,
        EventType::Pot2Press,
        EventType::Pot3Press,
        EventType::AmbientOff,
        EventType::None,
    ] {
        let before = light.snapshot();
        assert_eq!(light.dispatch(event), Transition::Ignore);
        assert_eq!(light.snapshot(), before);
    }

    light.dispatch(EventType::AmbientOn);
    for event in [EventType::Pot2Press, EventType::Pot3Press, EventType::AmbientOn] {
        assert_eq!(light.dispatch(event), Transition::Ignore);
        assert_eq!(light.state(), OperatingState::WhiteLight);
    }
    assert!(light.board().leds.flashes.is_empty());
}

#[test]
fn white_light_follows_colour_temperature_and_brightness() {
    let mailbox = EventMailbox::new();
    let mut light = light(&mailbox);
    light.dispatch(EventType::AmbientOn);

    light.board_mut().pots.set(Pot::Colour, 0);
    light.board_mut().pots.set(Pot::Brightness, ADC_MAX);
    light.render();
    let full = MockColourModel.kelvin_to_pulses(KELVIN_MIN);
    assert_eq!(light.board().leds.last_levels(), Some(full));

    // 2048 of 4095 is brightness 500 of 1000.
    light.board_mut().pots.set(Pot::Brightness, 2048);
    light.render();
    assert_eq!(light.board().leds.last_levels(), Some(full.dimmed(500)));
}

#[test]
fn rgb_light_follows_the_hue_wheel() {
    let mailbox = EventMailbox::new();
    let mut light = light(&mailbox);
    light.dispatch(EventType::AmbientOn);
    light.dispatch(EventType::Pot1Press);

    light.board_mut().pots.set(Pot::Colour, 0);
    light.board_mut().pots.set(Pot::Brightness, ADC_MAX);
    light.render();
    assert_eq!(
        light.board().leds.last_levels(),
        Some(ChannelLevels::new(PWM_PERIOD, 0, 0))
    );

    light.board_mut().pots.set(Pot::Brightness, 0);
    light.render();
    assert_eq!(light.board().leds.last_levels(), Some(ChannelLevels::OFF));
}

#[test]
fn standby_stays_dark_whatever_the_pots() {
    let mailbox = EventMailbox::new();
    let mut light = light(&mailbox);
    light.board_mut().pots.set(Pot::Brightness, ADC_MAX);
    light.board_mut().pots.set(Pot::Colour, 1234);

    light.render();
    assert_eq!(light.board().leds.last_levels(), Some(ChannelLevels::OFF));
}

#[test]
fn dispatch_pending_drains_the_mailbox() {
    let mailbox = EventMailbox::new();
    let mut light = light(&mailbox);

    mailbox.post(EventType::AmbientOn);
    assert_eq!(light.dispatch_pending(), Some(Transition::TurnOn));
    assert_eq!(light.dispatch_pending(), None);
}

#[test]
fn only_the_latest_posted_event_is_dispatched() {
    let mailbox = EventMailbox::new();
    let mut light = light(&mailbox);

    mailbox.post(EventType::Pot1Hold);
    mailbox.post(EventType::AmbientOn);
    light.dispatch_pending();

    assert_eq!(light.state(), OperatingState::WhiteLight);
    assert_eq!(light.dispatch_pending(), None);
}

#[test]
fn poll_turns_on_in_the_dark_and_off_in_daylight() {
    let mailbox = EventMailbox::new();
    let mut light = light_with_sensor(&mailbox, MockSensor::new());
    // Thresholds 1000 / 1500 mlux.
    light.board_mut().pots.set(Pot::Sensitivity, 1000);

    assert_eq!(light.poll(), Ok(Transition::Ignore));
    assert_eq!(light.state(), OperatingState::Standby);

    light.board_mut().sensor.push(999, 1);
    assert_eq!(light.poll(), Ok(Transition::TurnOn));
    assert_eq!(light.state(), OperatingState::WhiteLight);

    // Inside the hysteresis band nothing happens.
    light.board_mut().sensor.push(1200, 1);
    assert_eq!(light.poll(), Ok(Transition::Ignore));
    assert_eq!(light.state(), OperatingState::WhiteLight);

    light.board_mut().sensor.push(1501, 1);
    assert_eq!(light.poll(), Ok(Transition::TurnOff));
    assert_eq!(light.state(), OperatingState::Standby);
}

#[test]
fn poll_reports_sensor_errors() {
    let mailbox = EventMailbox::new();
    let mut sensor = MockSensor::constant(10);
    sensor.faults = 1;
    let mut light = light_with_sensor(&mailbox, sensor);
    light.board_mut().pots.set(Pot::Sensitivity, 1000);

    assert_eq!(light.poll(), Err(SensorBusError));
    assert_eq!(light.state(), OperatingState::Standby);
    assert_eq!(light.poll(), Ok(Transition::TurnOn));
}

#[test]
fn poll_leaves_the_sensor_alone_during_calibration() {
    let mailbox = EventMailbox::new();
    let mut light = light_with_sensor(&mailbox, MockSensor::new());
    light.dispatch(EventType::Pot1Hold);

    light.board_mut().sensor.push(0, 1);
    assert_eq!(light.poll(), Ok(Transition::Ignore));
    assert_eq!(light.state(), OperatingState::PotCalibration);
    assert_eq!(light.board().sensor.taken, 0);
}
