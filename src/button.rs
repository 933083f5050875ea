//! Debounced button automata and press/hold classification.
//!
//! Each potentiometer button runs a three-state automaton fed by raw GPIO
//! edges from its interrupt. A release produces a press or hold event; when
//! one button's release is recognised, every other button still held down
//! is invalidated so a chord resolves to the button that finished first.

use crate::config::{BUTTON_COUNT, DEBOUNCE_MS, HOLD_THRESHOLD_MS};
use crate::event::{EventMailbox, EventType};
use crate::time::{TimeInstant, TimeSource, millis_between};
use embedded_hal::digital::InputPin;

/// Automaton state of a single button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    /// Button up, waiting for a press.
    Released,
    /// Press accepted, waiting for the release.
    Pressed,
    /// Press began before another button's release was recognised; the next
    /// edge is swallowed.
    Invalid,
}

/// Errors returned by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonError {
    /// Button index outside `0..BUTTON_COUNT`.
    UnknownButton(usize),
}

impl core::fmt::Display for ButtonError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ButtonError::UnknownButton(index) => {
                write!(f, "button {} does not exist", index)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ButtonError {}

#[derive(Debug, Clone, Copy)]
struct Button<I> {
    state: ButtonState,
    last_transition: Option<I>,
}

/// Debounces the three potentiometer buttons and classifies releases.
///
/// Owned by the button interrupt context. Timestamps come from the caller
/// so the automata can be driven from any monotonic clock.
pub struct EventSource<I: TimeInstant> {
    buttons: [Button<I>; BUTTON_COUNT],
}

impl<I: TimeInstant> EventSource<I> {
    /// Creates the automata from the sampled physical levels.
    ///
    /// A button that is already down at startup begins `Invalid`, so the
    /// release of that in-progress press does not produce an event.
    pub fn new(pressed: [bool; BUTTON_COUNT]) -> Self {
        let buttons = pressed.map(|down| Button {
            state: if down {
                ButtonState::Invalid
            } else {
                ButtonState::Released
            },
            last_transition: None,
        });
        Self { buttons }
    }

    /// Samples active-low button pins and creates the automata.
    pub fn from_pins<P: InputPin>(pins: &mut [P; BUTTON_COUNT]) -> Result<Self, P::Error> {
        let mut pressed = [false; BUTTON_COUNT];
        for (level, pin) in pressed.iter_mut().zip(pins.iter_mut()) {
            *level = pin.is_low()?;
        }
        Ok(Self::new(pressed))
    }

    /// Current automaton state of `button`.
    pub fn state(&self, button: usize) -> Option<ButtonState> {
        self.buttons.get(button).map(|b| b.state)
    }

    /// Feeds one raw edge of `button` observed at `now`.
    ///
    /// Returns the press or hold event when the edge completes a valid
    /// release.
    pub fn on_button_edge(
        &mut self,
        button: usize,
        now: I,
    ) -> Result<Option<EventType>, ButtonError> {
        let current = self
            .buttons
            .get(button)
            .copied()
            .ok_or(ButtonError::UnknownButton(button))?;

        if current.state == ButtonState::Invalid {
            trace!("button {}: stray release swallowed", button);
            self.buttons[button] = Button {
                state: ButtonState::Released,
                last_transition: Some(now),
            };
            return Ok(None);
        }

        let elapsed = current.last_transition.map(|last| millis_between(last, now));
        if matches!(elapsed, Some(dt) if dt < DEBOUNCE_MS) {
            return Ok(None);
        }

        match current.state {
            ButtonState::Released => {
                self.buttons[button] = Button {
                    state: ButtonState::Pressed,
                    last_transition: Some(now),
                };
                Ok(None)
            }
            ButtonState::Pressed => {
                self.buttons[button] = Button {
                    state: ButtonState::Released,
                    last_transition: Some(now),
                };
                self.invalidate_others(button);

                // A press always sets the timestamp, so `elapsed` is known here.
                let held_for = elapsed.unwrap_or(0);
                let event = if held_for < HOLD_THRESHOLD_MS {
                    EventType::press(button)
                } else {
                    EventType::hold(button)
                };
                debug!("button {}: released after {} ms -> {:?}", button, held_for, event);
                Ok(event)
            }
            ButtonState::Invalid => Ok(None),
        }
    }

    /// Feeds an edge stamped with `clock` and posts any resulting event.
    ///
    /// This is the body of the button interrupt handler.
    pub fn record_edge<T: TimeSource<I>>(
        &mut self,
        button: usize,
        clock: &T,
        mailbox: &EventMailbox,
    ) -> Result<Option<EventType>, ButtonError> {
        let event = self.on_button_edge(button, clock.now())?;
        if let Some(event) = event {
            mailbox.post(event);
        }
        Ok(event)
    }

    fn invalidate_others(&mut self, completed: usize) {
        for (index, other) in self.buttons.iter_mut().enumerate() {
            if index != completed && other.state == ButtonState::Pressed {
                debug!("button {}: invalidated by chord with {}", index, completed);
                other.state = ButtonState::Invalid;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TimeDuration;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Ms(u64);

    impl TimeDuration for Ms {
        fn as_millis(&self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct At(u64);

    impl TimeInstant for At {
        type Duration = Ms;

        fn duration_since(&self, earlier: Self) -> Ms {
            Ms(self.0.saturating_sub(earlier.0))
        }
    }

    fn edge(source: &mut EventSource<At>, button: usize, t: u64) -> Option<EventType> {
        source.on_button_edge(button, At(t)).unwrap()
    }

    #[test]
    fn press_then_release_is_a_short_press() {
        let mut source = EventSource::new([false; 3]);
        assert_eq!(edge(&mut source, 1, 100), None);
        assert_eq!(source.state(1), Some(ButtonState::Pressed));
        assert_eq!(edge(&mut source, 1, 400), Some(EventType::Pot2Press));
        assert_eq!(source.state(1), Some(ButtonState::Released));
    }

    #[test]
    fn hold_boundary_is_inclusive() {
        let mut source = EventSource::new([false; 3]);
        edge(&mut source, 0, 1000);
        assert_eq!(edge(&mut source, 0, 5999), Some(EventType::Pot1Press));

        edge(&mut source, 0, 10_000);
        assert_eq!(edge(&mut source, 0, 15_000), Some(EventType::Pot1Hold));
    }

    #[test]
    fn bounce_inside_window_is_ignored() {
        let mut source = EventSource::new([false; 3]);
        edge(&mut source, 2, 100);
        assert_eq!(edge(&mut source, 2, 149), None);
        assert_eq!(source.state(2), Some(ButtonState::Pressed));
        assert_eq!(edge(&mut source, 2, 150), Some(EventType::Pot3Press));
    }

    #[test]
    fn button_down_at_startup_swallows_first_release() {
        let mut source = EventSource::new([true, false, false]);
        assert_eq!(source.state(0), Some(ButtonState::Invalid));
        assert_eq!(edge(&mut source, 0, 10), None);
        assert_eq!(source.state(0), Some(ButtonState::Released));
    }

    #[test]
    fn unknown_button_is_rejected() {
        let mut source = EventSource::<At>::new([false; 3]);
        assert_eq!(
            source.on_button_edge(3, At(0)),
            Err(ButtonError::UnknownButton(3))
        );
    }
}
