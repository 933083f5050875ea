//! Integration tests for EventSource

mod common;
use common::*;

use nightlight_core::config::{DEBOUNCE_MS, HOLD_THRESHOLD_MS};
use nightlight_core::{ButtonError, ButtonState, EventMailbox, EventSource, EventType};
use proptest::prelude::*;

fn source() -> EventSource<TestInstant> {
    EventSource::new([false; 3])
}

#[test]
fn release_before_threshold_is_a_press() {
    let mut buttons = source();

    assert_eq!(buttons.on_button_edge(0, TestInstant(1000)), Ok(None));
    assert_eq!(buttons.state(0), Some(ButtonState::Pressed));
    assert_eq!(
        buttons.on_button_edge(0, TestInstant(1000 + HOLD_THRESHOLD_MS - 1)),
        Ok(Some(EventType::Pot1Press))
    );
    assert_eq!(buttons.state(0), Some(ButtonState::Released));
}

#[test]
fn release_at_threshold_is_a_hold() {
    let mut buttons = source();

    buttons.on_button_edge(2, TestInstant(0)).unwrap();
    assert_eq!(
        buttons.on_button_edge(2, TestInstant(HOLD_THRESHOLD_MS)),
        Ok(Some(EventType::Pot3Hold))
    );
}

#[test]
fn pins_low_at_startup_begin_invalid() {
    let mut pins = [MockPin::up(), MockPin::down(), MockPin::up()];
    let mut buttons = EventSource::<TestInstant>::from_pins(&mut pins).unwrap();

    assert_eq!(buttons.state(0), Some(ButtonState::Released));
    assert_eq!(buttons.state(1), Some(ButtonState::Invalid));
    assert_eq!(buttons.state(2), Some(ButtonState::Released));

    // Releasing the button held through startup produces nothing.
    assert_eq!(buttons.on_button_edge(1, TestInstant(6000)), Ok(None));
    assert_eq!(buttons.state(1), Some(ButtonState::Released));
}

#[test]
fn pin_read_failure_is_returned() {
    let mut pins = [
        MockPin::up(),
        MockPin::up(),
        MockPin {
            low: false,
            faulty: true,
        },
    ];
    assert_eq!(
        EventSource::<TestInstant>::from_pins(&mut pins).err(),
        Some(PinFault)
    );
}

#[test]
fn chord_resolves_to_the_first_release() {
    let mut buttons = source();

    buttons.on_button_edge(0, TestInstant(0)).unwrap();
    buttons.on_button_edge(1, TestInstant(100)).unwrap();

    // Button 2 releases first and wins.
    assert_eq!(
        buttons.on_button_edge(1, TestInstant(300)),
        Ok(Some(EventType::Pot2Press))
    );
    assert_eq!(buttons.state(0), Some(ButtonState::Invalid));

    // The other button's release is swallowed...
    assert_eq!(buttons.on_button_edge(0, TestInstant(6000)), Ok(None));
    assert_eq!(buttons.state(0), Some(ButtonState::Released));

    // ...and it works normally afterwards.
    buttons.on_button_edge(0, TestInstant(7000)).unwrap();
    assert_eq!(
        buttons.on_button_edge(0, TestInstant(7200)),
        Ok(Some(EventType::Pot1Press))
    );
}

#[test]
fn buttons_down_at_startup_swallow_their_release() {
    let mut buttons = EventSource::<TestInstant>::new([false, true, false]);
    assert_eq!(buttons.state(1), Some(ButtonState::Invalid));

    assert_eq!(buttons.on_button_edge(1, TestInstant(20)), Ok(None));
    assert_eq!(buttons.state(1), Some(ButtonState::Released));
}

#[test]
fn bounce_inside_the_window_is_ignored() {
    let mut buttons = source();

    buttons.on_button_edge(0, TestInstant(0)).unwrap();
    // A bounce would otherwise read as a release.
    assert_eq!(buttons.on_button_edge(0, TestInstant(DEBOUNCE_MS - 1)), Ok(None));
    assert_eq!(buttons.state(0), Some(ButtonState::Pressed));

    assert_eq!(
        buttons.on_button_edge(0, TestInstant(DEBOUNCE_MS)),
        Ok(Some(EventType::Pot1Press))
    );
}

#[test]
fn unknown_button_is_an_error() {
    let mut buttons = source();
    assert_eq!(
        buttons.on_button_edge(3, TestInstant(0)),
        Err(ButtonError::UnknownButton(3))
    );
}

#[test]
fn record_edge_posts_into_the_mailbox() {
    let mailbox = EventMailbox::new();
    let clock = MockTimeSource::new();
    let mut buttons = source();

    buttons.record_edge(1, &clock, &mailbox).unwrap();
    assert!(!mailbox.is_pending());

    clock.advance(HOLD_THRESHOLD_MS + 10);
    assert_eq!(
        buttons.record_edge(1, &clock, &mailbox),
        Ok(Some(EventType::Pot2Hold))
    );
    assert_eq!(mailbox.take(), Some(EventType::Pot2Hold));
    assert_eq!(mailbox.take(), None);
}

#[test]
fn second_release_overwrites_an_untaken_event() {
    let mailbox = EventMailbox::new();
    let clock = MockTimeSource::new();
    let mut buttons = source();

    for button in [0, 2] {
        buttons.record_edge(button, &clock, &mailbox).unwrap();
        clock.advance(200);
        buttons.record_edge(button, &clock, &mailbox).unwrap();
        clock.advance(200);
    }

    assert_eq!(mailbox.take(), Some(EventType::Pot3Press));
    assert_eq!(mailbox.take(), None);
}

/// Edges of one press cycle: press, release, and the gap before the next.
#[derive(Debug, Clone)]
struct Cycle {
    button: usize,
    held: u64,
    gap: u64,
    bounces: Vec<u64>,
}

fn cycle() -> impl Strategy<Value = Cycle> {
    (
        0usize..3,
        DEBOUNCE_MS..8000,
        DEBOUNCE_MS..2000,
        prop::collection::vec(1u64..DEBOUNCE_MS, 0..4),
    )
        .prop_map(|(button, held, gap, mut bounces)| {
            bounces.sort_unstable();
            Cycle {
                button,
                held,
                gap,
                bounces,
            }
        })
}

fn run(cycles: &[Cycle], with_bounce: bool) -> Vec<EventType> {
    let mut buttons = source();
    let mut events = Vec::new();
    let mut t = 0;

    let mut edge = |buttons: &mut EventSource<TestInstant>, button: usize, at: u64| {
        if let Ok(Some(event)) = buttons.on_button_edge(button, TestInstant(at)) {
            events.push(event);
        }
    };

    for c in cycles {
        for accepted in [t, t + c.held] {
            edge(&mut buttons, c.button, accepted);
            if with_bounce {
                for b in &c.bounces {
                    edge(&mut buttons, c.button, accepted + b);
                }
            }
        }
        t += c.held + c.gap;
    }
    events
}

proptest! {
    #[test]
    fn bounce_does_not_change_the_events(cycles in prop::collection::vec(cycle(), 1..8)) {
        let clean = run(&cycles, false);
        prop_assert_eq!(clean.len(), cycles.len());
        prop_assert_eq!(run(&cycles, true), clean);
    }
}
