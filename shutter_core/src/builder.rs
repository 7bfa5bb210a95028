//! Type-state builder for `Shutter` and generic `build_shutter` constructor.
//!
//! The builder enforces at compile time that a Motor and a StateStore are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use shutter_traits::clock::{Clock, MonotonicClock};
use shutter_traits::{Motor, StateStore};

use crate::config::{CourseCfg, SafetyCfg};
use crate::error::{BuildError, Result};
use crate::hw_error::map_store_error;
use crate::shutter::{LevelCallback, Shutter};
use crate::stored_state::MAX_COURSE_TIME;

/// Shutter over boxed hardware, as produced by `ShutterBuilder`.
pub type DynShutter = Shutter<Box<dyn Motor>, Box<dyn StateStore>>;

impl DynShutter {
    /// Start building a shutter.
    pub fn builder() -> ShutterBuilder<Missing, Missing> {
        ShutterBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `DynShutter`. All fields are validated on `build()`.
pub struct ShutterBuilder<M, S> {
    motor: Option<Box<dyn Motor>>,
    store: Option<Box<dyn StateStore>>,
    course: Option<CourseCfg>,
    safety: Option<SafetyCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    on_level: Option<LevelCallback>,
    _m: PhantomData<M>,
    _s: PhantomData<S>,
}

impl Default for ShutterBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            motor: None,
            store: None,
            course: None,
            safety: None,
            clock: None,
            on_level: None,
            _m: PhantomData,
            _s: PhantomData,
        }
    }
}

/// Validate configuration, construct the shutter and prime it from `store`.
///
/// This is the single source of truth for validation and construction,
/// used by both `ShutterBuilder::try_build()` and `build_shutter()`.
///
/// When `course.up_course_ms` is non-zero the course times are applied and
/// the shutter leaves reset mode; otherwise it stays in reset mode for the
/// caller to configure.
fn validate_and_build<M: Motor, S: StateStore>(
    motor: M,
    mut store: S,
    course: CourseCfg,
    safety: SafetyCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    on_level: Option<LevelCallback>,
) -> Result<Shutter<M, S>> {
    // ── Validation ───────────────────────────────────────────────────────────
    let ratio = course.calibration_ratio;
    if !(ratio.is_finite() && ratio > 0.0 && ratio <= 1.0) {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "calibration_ratio must be in (0.0, 1.0]",
        )));
    }
    if course.up_course_ms > MAX_COURSE_TIME {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "up_course_ms exceeds 26 bits",
        )));
    }
    if course.down_course_ms > MAX_COURSE_TIME {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "down_course_ms exceeds 26 bits",
        )));
    }
    if course.up_course_ms == 0 && course.down_course_ms != 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "down_course_ms set without up_course_ms",
        )));
    }
    if safety.delay_ms > 60_000 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "safety delay_ms must be <= 60000",
        )));
    }

    // ── Restore ──────────────────────────────────────────────────────────────
    let persisted = match store.load() {
        Ok(raw) => raw,
        Err(e) => {
            let e = map_store_error(&*e);
            tracing::warn!(error = %e, "loading stored state failed; position unknown");
            None
        }
    };

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    let mut shutter = Shutter::new(motor, store, clock, safety, ratio, on_level);
    if let Some(raw) = persisted {
        shutter.restore_state(raw);
    }
    if course.up_course_ms != 0 {
        shutter.set_course_time(course.up_course_ms, course.down_course_ms);
        shutter.begin();
    }
    tracing::debug!(
        level = ?shutter.current_level(),
        reset = shutter.is_reset(),
        "shutter built"
    );
    Ok(shutter)
}

impl<M, S> ShutterBuilder<M, S> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<DynShutter> {
        let motor = self
            .motor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;

        validate_and_build(
            motor,
            store,
            self.course.unwrap_or_default(),
            self.safety.unwrap_or_default(),
            self.clock,
            self.on_level,
        )
    }
}

/// Chainable setters that do not affect type-state.
impl<M, S> ShutterBuilder<M, S> {
    pub fn with_course(mut self, course: CourseCfg) -> Self {
        self.course = Some(course);
        self
    }
    /// Shorthand for `with_course` keeping the current calibration ratio.
    pub fn with_course_time(mut self, up_ms: u32, down_ms: u32) -> Self {
        let mut c = self.course.unwrap_or_default();
        c.up_course_ms = up_ms;
        c.down_course_ms = down_ms;
        self.course = Some(c);
        self
    }
    pub fn with_calibration_ratio(mut self, ratio: f32) -> Self {
        let mut c = self.course.unwrap_or_default();
        c.calibration_ratio = ratio;
        self.course = Some(c);
        self
    }
    pub fn with_safety(mut self, safety: SafetyCfg) -> Self {
        self.safety = Some(safety);
        self
    }
    /// Observer called with every level the shutter passes or settles at.
    pub fn on_level_reached<F>(mut self, f: F) -> Self
    where
        F: FnMut(u8) + 'static,
    {
        self.on_level = Some(Box::new(f));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<S> ShutterBuilder<Missing, S> {
    pub fn with_motor(self, motor: impl Motor + 'static) -> ShutterBuilder<Set, S> {
        ShutterBuilder {
            motor: Some(Box::new(motor)),
            store: self.store,
            course: self.course,
            safety: self.safety,
            clock: self.clock,
            on_level: self.on_level,
            _m: PhantomData,
            _s: PhantomData,
        }
    }
}

impl<M> ShutterBuilder<M, Missing> {
    pub fn with_store(self, store: impl StateStore + 'static) -> ShutterBuilder<M, Set> {
        ShutterBuilder {
            motor: self.motor,
            store: Some(Box::new(store)),
            course: self.course,
            safety: self.safety,
            clock: self.clock,
            on_level: self.on_level,
            _m: PhantomData,
            _s: PhantomData,
        }
    }
}

impl ShutterBuilder<Set, Set> {
    /// Validate and build the shutter. Only available when Motor and StateStore are set.
    pub fn build(self) -> Result<DynShutter> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched `Shutter` from concrete hardware.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_shutter<M, S>(
    motor: M,
    store: S,
    course: CourseCfg,
    safety: SafetyCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Shutter<M, S>>
where
    M: Motor,
    S: StateStore,
{
    validate_and_build(motor, store, course, safety, clock, None)
}
