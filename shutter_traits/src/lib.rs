//! Hardware seams for the shutter controller.
//!
//! The core never touches relays, storage or time directly; it goes through
//! the traits defined here so the same state machine runs on a Raspberry Pi,
//! in the simulator and under test.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Direction of travel. By convention `Down` increases the level
/// (0 = fully open, 100 = fully closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// Relay / H-bridge driving the shutter motor.
///
/// Issuing the same command twice in a row is not expected but must not fault.
pub trait Motor {
    fn drive(&mut self, direction: Direction) -> Result<(), BoxError>;
    fn halt(&mut self) -> Result<(), BoxError>;
}

/// Persistence medium for the packed stored state (flash, EEPROM, file).
///
/// `store` is called on every settled level change, so implementations should
/// treat it as a small, frequent, wear-levelled write.
pub trait StateStore {
    /// Previously persisted value, or `None` if nothing was ever written.
    fn load(&mut self) -> Result<Option<u64>, BoxError>;
    fn store(&mut self, state: u64) -> Result<(), BoxError>;
}

impl<T: Motor + ?Sized> Motor for Box<T> {
    fn drive(&mut self, direction: Direction) -> Result<(), BoxError> {
        (**self).drive(direction)
    }

    fn halt(&mut self) -> Result<(), BoxError> {
        (**self).halt()
    }
}

impl<T: StateStore + ?Sized> StateStore for Box<T> {
    fn load(&mut self) -> Result<Option<u64>, BoxError> {
        (**self).load()
    }

    fn store(&mut self, state: u64) -> Result<(), BoxError> {
        (**self).store(state)
    }
}
