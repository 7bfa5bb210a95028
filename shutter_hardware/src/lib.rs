//! Relay drivers and state stores for the shutter controller.
//!
//! Everything here implements the seams from `shutter_traits`. The GPIO relay
//! is only built with the `hardware` feature on Linux.

pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod store;

use std::cell::Cell;
use std::rc::Rc;

use shutter_traits::{BoxError, Direction, Motor};
use tracing::debug;

pub use store::{FileStateStore, MemoryStateStore, write_atomic};

/// Relay outputs of the simulator: which direction is energized, if any.
#[derive(Debug, Clone, Default)]
pub struct RelayOutput {
    energized: Rc<Cell<Option<Direction>>>,
    switches: Rc<Cell<u32>>,
}

impl RelayOutput {
    /// Direction currently energized; `None` when halted.
    pub fn energized(&self) -> Option<Direction> {
        self.energized.get()
    }

    /// Number of relay state changes seen so far.
    pub fn switches(&self) -> u32 {
        self.switches.get()
    }

    fn set(&self, next: Option<Direction>) {
        if self.energized.get() != next {
            self.switches.set(self.switches.get().saturating_add(1));
        }
        self.energized.set(next);
    }
}

/// Simulated two-relay motor. Never fails.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRelay {
    output: RelayOutput,
}

impl SimulatedRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for observing the relay outputs after the relay is moved into
    /// the shutter.
    pub fn output(&self) -> RelayOutput {
        self.output.clone()
    }
}

impl Motor for SimulatedRelay {
    fn drive(&mut self, direction: Direction) -> Result<(), BoxError> {
        debug!(%direction, "relay energized (simulated)");
        self.output.set(Some(direction));
        Ok(())
    }

    fn halt(&mut self) -> Result<(), BoxError> {
        debug!("relay released (simulated)");
        self.output.set(None);
        Ok(())
    }
}
