//! What a single `tick` left the shutter doing.

/// Lifecycle state of the position state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Motor off.
    Idle,
    /// Level unknown; driving fully up to re-anchor at 0.
    Resetting,
    /// Moving toward the target one level per step time.
    Targeting,
    /// Finishing the current step before halting at an integral level.
    Normalizing,
    /// Overrunning an endpoint to seat the shutter against its stop.
    Calibrating,
}

impl core::fmt::Display for State {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            State::Idle => "idle",
            State::Resetting => "resetting",
            State::Targeting => "targeting",
            State::Normalizing => "normalizing",
            State::Calibrating => "calibrating",
        };
        f.write_str(s)
    }
}

/// Public status after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterStatus {
    /// Not configured (or reset); ticks do nothing.
    Reset,
    /// Relays are cooling down after a halt.
    SafetyDelay,
    /// Stopped at a known level with nothing queued.
    Idle,
    /// Stopped, but a target is queued or the level is unknown.
    Pending,
    /// Motor energized.
    Moving(State),
}

impl ShutterStatus {
    /// Nothing left to do until a new request arrives.
    pub fn is_settled(self) -> bool {
        matches!(self, ShutterStatus::Idle)
    }
}
