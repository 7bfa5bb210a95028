//! Runtime configuration for the shutter state machine and its driver loop.
//!
//! These are the plain structs consumed by `ShutterBuilder` and the runner.
//! They are separate from the TOML-deserialized config in `shutter_config`.

/// Motor protection settings.
#[derive(Debug, Clone, Copy)]
pub struct SafetyCfg {
    /// Cool-down after every halt before the relays may switch again (ms).
    pub delay_ms: u64,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

/// Travel timings of one shutter.
#[derive(Debug, Clone, Copy)]
pub struct CourseCfg {
    /// Full 100 -> 0 traversal (ms).
    pub up_course_ms: u32,
    /// Full 0 -> 100 traversal (ms). 0 means same as up.
    pub down_course_ms: u32,
    /// Fraction of course time driven past an endpoint. Range: (0.0, 1.0].
    pub calibration_ratio: f32,
}

impl Default for CourseCfg {
    fn default() -> Self {
        Self {
            up_course_ms: 0,
            down_course_ms: 0,
            calibration_ratio: 0.1,
        }
    }
}

/// Parameters for `runner::run_until_settled`.
#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    /// Period between ticks (ms).
    pub tick_ms: u64,
    /// Hard cap on a single move (ms). 0 derives a cap from the course times.
    pub max_run_ms: u64,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            max_run_ms: 0,
        }
    }
}
