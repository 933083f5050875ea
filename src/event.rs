//! Events and the single-slot mailbox between interrupt contexts and the
//! driver loop.
//!
//! The mailbox holds at most one event. A post that lands before the
//! previous event was taken overwrites it: two button releases between two
//! dispatches lose the first one.

use portable_atomic::{AtomicU8, Ordering};

/// Events that can move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventType {
    /// Pot 1 button released before the hold threshold.
    Pot1Press,
    /// Pot 2 button released before the hold threshold.
    Pot2Press,
    /// Pot 3 button released before the hold threshold.
    Pot3Press,
    /// Pot 1 button released at or after the hold threshold.
    Pot1Hold,
    /// Pot 2 button released at or after the hold threshold.
    Pot2Hold,
    /// Pot 3 button released at or after the hold threshold.
    Pot3Hold,
    /// Ambient light fell below the lower hysteresis threshold.
    AmbientOn,
    /// Ambient light rose above the upper hysteresis threshold.
    AmbientOff,
    /// Nothing pending.
    None,
}

impl EventType {
    /// Short-press event for the zero-based button index.
    pub fn press(button: usize) -> Option<Self> {
        match button {
            0 => Some(EventType::Pot1Press),
            1 => Some(EventType::Pot2Press),
            2 => Some(EventType::Pot3Press),
            _ => None,
        }
    }

    /// Long-hold event for the zero-based button index.
    pub fn hold(button: usize) -> Option<Self> {
        match button {
            0 => Some(EventType::Pot1Hold),
            1 => Some(EventType::Pot2Hold),
            2 => Some(EventType::Pot3Hold),
            _ => None,
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            EventType::None => 0,
            EventType::Pot1Press => 1,
            EventType::Pot2Press => 2,
            EventType::Pot3Press => 3,
            EventType::Pot1Hold => 4,
            EventType::Pot2Hold => 5,
            EventType::Pot3Hold => 6,
            EventType::AmbientOn => 7,
            EventType::AmbientOff => 8,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => EventType::Pot1Press,
            2 => EventType::Pot2Press,
            3 => EventType::Pot3Press,
            4 => EventType::Pot1Hold,
            5 => EventType::Pot2Hold,
            6 => EventType::Pot3Hold,
            7 => EventType::AmbientOn,
            8 => EventType::AmbientOff,
            _ => EventType::None,
        }
    }
}

/// Single-slot, overwrite-on-post event holder.
///
/// Interrupt contexts call [`post`](Self::post); the driver loop calls
/// [`take`](Self::take). Safe to place in a `static`.
pub struct EventMailbox {
    slot: AtomicU8,
}

impl EventMailbox {
    /// Creates an empty mailbox.
    pub const fn new() -> Self {
        Self {
            slot: AtomicU8::new(EventType::None.to_u8()),
        }
    }

    /// Stores `event`, replacing any unread one. Posting `None` clears the slot.
    pub fn post(&self, event: EventType) {
        let previous = EventType::from_u8(self.slot.swap(event.to_u8(), Ordering::AcqRel));
        if previous != EventType::None && event != EventType::None {
            debug!("mailbox: {:?} overwritten by {:?}", previous, event);
        }
    }

    /// Removes and returns the pending event, if any.
    pub fn take(&self) -> Option<EventType> {
        match EventType::from_u8(self.slot.swap(EventType::None.to_u8(), Ordering::AcqRel)) {
            EventType::None => None,
            event => Some(event),
        }
    }

    /// Removes the pending event only if it equals `wanted`.
    ///
    /// Any other pending event is left in place for the next dispatch.
    pub fn take_if(&self, wanted: EventType) -> bool {
        if wanted == EventType::None {
            return false;
        }
        self.slot
            .compare_exchange(
                wanted.to_u8(),
                EventType::None.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Returns the pending event without removing it.
    pub fn peek(&self) -> EventType {
        EventType::from_u8(self.slot.load(Ordering::Acquire))
    }

    /// True if an event is waiting.
    pub fn is_pending(&self) -> bool {
        self.peek() != EventType::None
    }
}

impl Default for EventMailbox {
    fn default() -> Self {
        Self::new()
    }
}
