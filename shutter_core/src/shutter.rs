//! The position state machine (`Shutter`).
//!
//! Position is never measured; it is inferred from how long a relay has been
//! energized. Every call to `tick` compares the clock against the time of the
//! last transition and advances by at most one step, so the machine never
//! blocks and can be driven from any fixed-period loop.

use std::sync::Arc;
use std::time::Instant;

use eyre::WrapErr;
use shutter_traits::clock::Clock;
use shutter_traits::{Direction, Motor, StateStore};

use crate::config::SafetyCfg;
use crate::error::Result;
use crate::hw_error::{map_hw_error, map_store_error};
use crate::status::{ShutterStatus, State};
use crate::stored_state::{MAX_LEVEL, StoredState, course_time_in_range};
use crate::util::{calibration_time_ms, step_time_ms};

pub(crate) type LevelCallback = Box<dyn FnMut(u8)>;

/// One motorized shutter.
pub struct Shutter<M: Motor, S: StateStore> {
    pub(crate) motor: M,
    pub(crate) store: S,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) safety: SafetyCfg,
    pub(crate) on_level: Option<LevelCallback>,

    pub(crate) up_course_ms: u32,
    pub(crate) down_course_ms: u32,
    pub(crate) calibration_ratio: f32,
    pub(crate) up_step_ms: u64,
    pub(crate) down_step_ms: u64,
    pub(crate) up_calibration_ms: u64,
    pub(crate) down_calibration_ms: u64,

    pub(crate) stored: StoredState,
    pub(crate) state: State,
    pub(crate) state_time_ms: u64,
    pub(crate) direction: Direction,
    pub(crate) current_level: Option<u8>,
    pub(crate) target_level: Option<u8>,
    pub(crate) safety_delay_since: Option<u64>,
    pub(crate) reset: bool,
}

impl<M: Motor, S: StateStore> core::fmt::Debug for Shutter<M, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Shutter")
            .field("state", &self.state)
            .field("direction", &self.direction)
            .field("current_level", &self.current_level)
            .field("target_level", &self.target_level)
            .field("up_course_ms", &self.up_course_ms)
            .field("down_course_ms", &self.down_course_ms)
            .field("reset", &self.reset)
            .finish_non_exhaustive()
    }
}

impl<M: Motor, S: StateStore> Shutter<M, S> {
    pub(crate) fn new(
        motor: M,
        store: S,
        clock: Arc<dyn Clock + Send + Sync>,
        safety: SafetyCfg,
        calibration_ratio: f32,
        on_level: Option<LevelCallback>,
    ) -> Self {
        let epoch = clock.now();
        Self {
            motor,
            store,
            clock,
            epoch,
            safety,
            on_level,
            up_course_ms: 0,
            down_course_ms: 0,
            calibration_ratio,
            up_step_ms: 0,
            down_step_ms: 0,
            up_calibration_ms: 0,
            down_calibration_ms: 0,
            stored: StoredState::new(),
            state: State::Idle,
            state_time_ms: 0,
            direction: Direction::Up,
            current_level: None,
            target_level: None,
            safety_delay_since: None,
            reset: true,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Current level, `None` while the position is unknown.
    pub fn current_level(&self) -> Option<u8> {
        self.current_level
    }

    /// Pending request, if any.
    pub fn target_level(&self) -> Option<u8> {
        self.target_level
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// True until `begin` succeeds, and again after `reset`.
    pub fn is_reset(&self) -> bool {
        self.reset
    }

    pub fn up_course_time(&self) -> u32 {
        self.up_course_ms
    }

    pub fn down_course_time(&self) -> u32 {
        self.down_course_ms
    }

    pub fn calibration_ratio(&self) -> f32 {
        self.calibration_ratio
    }

    /// The codec as it would be persisted now.
    pub fn stored_state(&self) -> StoredState {
        self.stored
    }

    /// Status without advancing the machine.
    pub fn status(&self) -> ShutterStatus {
        if self.reset {
            ShutterStatus::Reset
        } else if self.safety_delay_since.is_some() {
            ShutterStatus::SafetyDelay
        } else if self.state != State::Idle {
            ShutterStatus::Moving(self.state)
        } else if self.target_level.is_some() || self.current_level.is_none() {
            ShutterStatus::Pending
        } else {
            ShutterStatus::Idle
        }
    }

    // ── Configuration ────────────────────────────────────────────────────────

    /// Configure both course times. Only honoured while in reset mode.
    ///
    /// `down_ms == 0` means "same as up". Values outside `1..=2^26-1` are
    /// ignored. If the times differ from the stored ones, the known level is
    /// dropped since it was measured against another timing.
    pub fn set_course_time(&mut self, up_ms: u32, down_ms: u32) {
        if !self.reset {
            tracing::debug!("set_course_time ignored outside reset mode");
            return;
        }
        let down_ms = if down_ms == 0 { up_ms } else { down_ms };
        if !course_time_in_range(up_ms) || !course_time_in_range(down_ms) {
            tracing::debug!(up_ms, down_ms, "set_course_time ignored: out of range");
            return;
        }

        if up_ms != self.stored.up_course_time() || down_ms != self.stored.down_course_time() {
            tracing::debug!("course time changed, invalidating stored level");
            self.stored.set_level(None);
            self.current_level = None;
        }

        self.up_course_ms = up_ms;
        self.down_course_ms = down_ms;
        self.up_step_ms = step_time_ms(up_ms);
        self.down_step_ms = step_time_ms(down_ms);
        self.recompute_calibration();
        self.stored.set_up_course_time(up_ms);
        self.stored.set_down_course_time(down_ms);
        self.persist();
    }

    /// Change the endpoint overrun ratio; both calibration times follow
    /// immediately. A calibration already in progress keeps running and is
    /// judged against the new duration.
    pub fn set_calibration_ratio(&mut self, ratio: f32) {
        if !ratio.is_finite() || ratio < 0.0 {
            tracing::debug!(ratio, "set_calibration_ratio ignored");
            return;
        }
        self.calibration_ratio = ratio;
        self.recompute_calibration();
    }

    fn recompute_calibration(&mut self) {
        self.up_calibration_ms = calibration_time_ms(self.up_course_ms, self.calibration_ratio);
        self.down_calibration_ms =
            calibration_time_ms(self.down_course_ms, self.calibration_ratio);
    }

    /// Prime from a persisted value. Only honoured while in reset mode.
    ///
    /// Returns whether the value was valid. An invalid value still loads its
    /// course times (so `set_course_time` can compare against them) but leaves
    /// the level unknown.
    pub fn restore_state(&mut self, raw: u64) -> bool {
        if !self.reset {
            return false;
        }
        self.stored = StoredState::from_u64(raw);
        if self.stored.is_valid() {
            tracing::debug!(state = %self.stored, level = ?self.stored.level(), "stored state is valid");
            self.current_level = self.stored.level();
            self.notify_level();
            true
        } else {
            tracing::debug!(state = %self.stored, "stored state is invalid");
            self.stored.set_level(None);
            false
        }
    }

    /// `restore_state` from the 20-digit decimal form.
    pub fn restore_state_str(&mut self, text: &str) -> bool {
        let raw = StoredState::from_decimal(text).to_u64();
        self.restore_state(raw)
    }

    /// Leave reset mode. Requires both course times to be configured.
    pub fn begin(&mut self) -> bool {
        if self.up_course_ms == 0 || self.down_course_ms == 0 {
            tracing::debug!("begin ignored: course times not set");
            return false;
        }
        // The codec may have been zeroed by `reset`.
        self.stored.set_up_course_time(self.up_course_ms);
        self.stored.set_down_course_time(self.down_course_ms);
        self.reset = false;
        true
    }

    // ── Requests ─────────────────────────────────────────────────────────────

    /// Request a level in `0..=100`. Applied by subsequent ticks.
    pub fn set_level(&mut self, level: u8) {
        if self.reset || level > MAX_LEVEL {
            tracing::debug!(level, reset = self.reset, "set_level ignored");
            return;
        }
        if self.state == State::Idle && Some(level) == self.current_level {
            return;
        }
        if matches!(self.state, State::Targeting | State::Normalizing)
            && Some(level) == self.target_level
        {
            return;
        }

        self.target_level = Some(level);
        let direction = direction_towards(self.current_level, level);
        if self.state == State::Targeting && self.direction != direction {
            tracing::debug!(level, "direction change requested, normalizing");
            self.state = State::Normalizing;
        }
    }

    /// Settle at the next integral level and drop the pending request.
    pub fn stop(&mut self) {
        if self.reset || self.state == State::Idle {
            return;
        }
        self.target_level = None;
        if self.state == State::Targeting {
            tracing::debug!("stop requested, normalizing");
            self.state = State::Normalizing;
        }
    }

    /// Halt immediately and forget the position and persisted state.
    ///
    /// The machine is left in reset mode with its course times kept, so
    /// `begin` re-arms it directly. The halt error, if any, is returned after
    /// the state has been cleared.
    pub fn reset(&mut self) -> Result<()> {
        let halted = self.halt();
        self.stored.reset();
        self.persist();
        self.reset = true;
        self.state = State::Idle;
        self.current_level = None;
        self.target_level = None;
        tracing::info!("shutter reset");
        halted.wrap_err("reset")
    }

    // ── Control loop ─────────────────────────────────────────────────────────

    /// Advance the machine by at most one transition.
    ///
    /// Motor errors are returned without advancing, so the next tick retries
    /// the same command.
    pub fn tick(&mut self) -> Result<ShutterStatus> {
        if self.reset {
            return Ok(ShutterStatus::Reset);
        }
        let now = self.now_ms();

        if let Some(since) = self.safety_delay_since {
            if now.saturating_sub(since) >= self.safety.delay_ms {
                tracing::debug!("end of safety delay");
                self.safety_delay_since = None;
            }
            return Ok(self.status());
        }

        let Some(level) = self.current_level else {
            self.tick_resetting(now)?;
            return Ok(self.status());
        };

        match self.state {
            State::Idle => match self.target_level {
                None => {}
                Some(target) if target == level => {
                    self.target_level = None;
                }
                Some(target) => self.start_move(now, level, target)?,
            },
            State::Calibrating => self.tick_calibrating(now)?,
            State::Targeting | State::Normalizing => self.tick_step(now, level)?,
            // A known level cannot be resetting; recover by going idle.
            State::Resetting => self.state = State::Idle,
        }

        Ok(self.status())
    }

    fn tick_resetting(&mut self, now: u64) -> Result<()> {
        if self.state != State::Resetting {
            tracing::debug!("level not known, resetting");
            self.drive(Direction::Up)?;
            self.direction = Direction::Up;
            self.state = State::Resetting;
            self.state_time_ms = now;
            return Ok(());
        }

        let needed = u64::from(self.up_course_ms) + self.up_calibration_ms;
        if now.saturating_sub(self.state_time_ms) >= needed {
            self.halt()?;
            self.state = State::Idle;
            self.current_level = Some(0);
            self.stored.set_level(Some(0));
            self.persist();
            tracing::info!("level now known");
            self.notify_level();
        }
        Ok(())
    }

    fn tick_calibrating(&mut self, now: u64) -> Result<()> {
        let needed = match self.direction {
            Direction::Up => self.up_calibration_ms,
            Direction::Down => self.down_calibration_ms,
        };
        if now.saturating_sub(self.state_time_ms) >= needed {
            self.halt()?;
            self.state = State::Idle;
            tracing::info!(level = ?self.current_level, "calibration done");
            self.notify_level();
            self.persist();
        }
        Ok(())
    }

    fn start_move(&mut self, now: u64, level: u8, target: u8) -> Result<()> {
        let direction = direction_towards(Some(level), target);
        tracing::debug!(from = level, to = target, %direction, "starting move");
        self.stored.set_level(None);
        self.persist();
        self.drive(direction)?;
        self.direction = direction;
        self.state = State::Targeting;
        self.state_time_ms = now;
        Ok(())
    }

    fn tick_step(&mut self, now: u64, level: u8) -> Result<()> {
        let step = match self.direction {
            Direction::Up => self.up_step_ms,
            Direction::Down => self.down_step_ms,
        };
        if now.saturating_sub(self.state_time_ms) < step {
            return Ok(());
        }

        let level = match self.direction {
            Direction::Up => level.saturating_sub(1),
            Direction::Down => level.saturating_add(1).min(MAX_LEVEL),
        };
        let endpoint = level == 0 || level == MAX_LEVEL;
        let stopping =
            !endpoint && (self.state == State::Normalizing || self.target_level == Some(level));

        // Halt before committing the step so a failed halt is retried on the
        // next tick from the same position.
        if stopping {
            self.halt()?;
        }
        self.current_level = Some(level);
        self.stored.set_level(Some(level));
        self.state_time_ms = now;

        if endpoint {
            tracing::debug!(level, "endpoint reached, calibrating");
            self.state = State::Calibrating;
            if self.target_level == Some(level) {
                self.target_level = None;
            }
            return Ok(());
        }

        if self.state == State::Normalizing {
            self.state = State::Idle;
            tracing::debug!(level, "finished normalizing");
            self.notify_level();
            if self.target_level.is_none() {
                self.persist();
            }
            return Ok(());
        }

        if stopping {
            self.state = State::Idle;
            self.target_level = None;
            tracing::info!(level, "reached target");
            self.notify_level();
            self.persist();
            return Ok(());
        }

        self.notify_level();
        Ok(())
    }

    // ── Private: hardware and persistence ────────────────────────────────────

    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    fn drive(&mut self, direction: Direction) -> Result<()> {
        self.motor
            .drive(direction)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("driving {direction}"))
    }

    fn halt(&mut self) -> Result<()> {
        self.motor
            .halt()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("halting motor")?;
        self.safety_delay_since = Some(self.now_ms());
        Ok(())
    }

    /// Best-effort write of the current encoding.
    fn persist(&mut self) {
        let raw = self.stored.to_u64();
        if let Err(e) = self.store.store(raw) {
            let e = map_store_error(&*e);
            tracing::warn!(error = %e, state = raw, "persisting shutter state failed");
        }
    }

    fn notify_level(&mut self) {
        let Some(level) = self.current_level else {
            return;
        };
        tracing::trace!(level, "level notified");
        if let Some(cb) = self.on_level.as_mut() {
            cb(level);
        }
    }
}

/// Down increases the level; an unknown current level always moves up.
fn direction_towards(current: Option<u8>, target: u8) -> Direction {
    match current {
        Some(current) if target > current => Direction::Down,
        _ => Direction::Up,
    }
}
