//! Test and helper mocks for shutter_core

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use shutter_traits::{BoxError, Direction, Motor, StateStore};

/// A motor command as seen by `SpyMotor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Drive(Direction),
    Halt,
}

/// Motor that records every command. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct SpyMotor {
    ops: Rc<RefCell<Vec<Op>>>,
}

impl SpyMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    pub fn last(&self) -> Option<Op> {
        self.ops.borrow().last().copied()
    }

    pub fn clear(&self) {
        self.ops.borrow_mut().clear();
    }
}

impl Motor for SpyMotor {
    fn drive(&mut self, direction: Direction) -> Result<(), BoxError> {
        self.ops.borrow_mut().push(Op::Drive(direction));
        Ok(())
    }

    fn halt(&mut self) -> Result<(), BoxError> {
        self.ops.borrow_mut().push(Op::Halt);
        Ok(())
    }
}

/// Spy motor whose next `n` halts fail. Drives always succeed; every
/// command, failed or not, is recorded. Clones share the log and the counter.
#[derive(Debug, Clone, Default)]
pub struct FlakyHaltMotor {
    spy: SpyMotor,
    failing_halts: Rc<Cell<u32>>,
}

impl FlakyHaltMotor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` halts fail.
    pub fn fail_next_halts(&self, n: u32) {
        self.failing_halts.set(n);
    }

    pub fn spy(&self) -> &SpyMotor {
        &self.spy
    }
}

impl Motor for FlakyHaltMotor {
    fn drive(&mut self, direction: Direction) -> Result<(), BoxError> {
        self.spy.drive(direction)
    }

    fn halt(&mut self) -> Result<(), BoxError> {
        self.spy.halt()?;
        let left = self.failing_halts.get();
        if left > 0 {
            self.failing_halts.set(left - 1);
            return Err(Box::new(std::io::Error::other("relay stuck")));
        }
        Ok(())
    }
}

/// State store that keeps every write. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct SpyStore {
    initial: Option<u64>,
    writes: Rc<RefCell<Vec<u64>>>,
}

impl SpyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that reports `state` as previously persisted.
    pub fn with_state(state: u64) -> Self {
        Self {
            initial: Some(state),
            writes: Rc::default(),
        }
    }

    pub fn writes(&self) -> Vec<u64> {
        self.writes.borrow().clone()
    }

    pub fn last(&self) -> Option<u64> {
        self.writes.borrow().last().copied()
    }
}

impl StateStore for SpyStore {
    fn load(&mut self) -> Result<Option<u64>, BoxError> {
        Ok(self.writes.borrow().last().copied().or(self.initial))
    }

    fn store(&mut self, state: u64) -> Result<(), BoxError> {
        self.writes.borrow_mut().push(state);
        Ok(())
    }
}

/// Motor whose every command fails; useful to check error propagation.
#[derive(Debug, Default)]
pub struct FailingMotor;

impl Motor for FailingMotor {
    fn drive(&mut self, _direction: Direction) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("relay not responding")))
    }

    fn halt(&mut self) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("relay not responding")))
    }
}

/// Store whose reads and writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore;

impl StateStore for FailingStore {
    fn load(&mut self) -> Result<Option<u64>, BoxError> {
        Err(Box::new(std::io::Error::other("storage unavailable")))
    }

    fn store(&mut self, _state: u64) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("storage unavailable")))
    }
}
