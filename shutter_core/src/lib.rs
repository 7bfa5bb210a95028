#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core shutter positioning logic (hardware-agnostic).
//!
//! This crate tracks a roller shutter's position without any sensor. All
//! hardware interactions go through `shutter_traits::Motor` and
//! `shutter_traits::StateStore`.
//!
//! ## Architecture
//!
//! - **State machine**: `Shutter` advances one level per step time and
//!   overruns the endpoints to re-seat itself (`shutter` module)
//! - **Stored state**: course times and level packed in one `u64`
//!   (`stored_state` module)
//! - **Safety**: a cool-down after every halt protects the relays
//! - **Construction**: type-state `ShutterBuilder` (`builder` module)
//! - **Driver loop**: `runner::run_until_settled`
//!
//! Levels run from 0 (fully open) to 100 (fully closed); `None` means the
//! position is unknown and the next move starts with a full upward reset pass.

pub mod builder;
pub mod config;
mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod runner;
pub mod shutter;
pub mod status;
pub mod stored_state;
pub mod util;

pub use crate::builder::{DynShutter, Missing, Set, ShutterBuilder, build_shutter};
pub use crate::config::{CourseCfg, RunParams, SafetyCfg};
pub use crate::error::{BuildError, Result, ShutterError};
pub use crate::shutter::Shutter;
pub use crate::status::{ShutterStatus, State};
pub use crate::stored_state::StoredState;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{Op, SpyMotor, SpyStore};
    use shutter_traits::{Direction, ManualClock};

    fn fixture(course: u32) -> (Shutter<SpyMotor, SpyStore>, SpyMotor, SpyStore, ManualClock) {
        let motor = SpyMotor::new();
        let store = SpyStore::new();
        let clock = ManualClock::new();
        let shutter = build_shutter(
            motor.clone(),
            store.clone(),
            CourseCfg {
                up_course_ms: course,
                down_course_ms: 0,
                calibration_ratio: 0.1,
            },
            SafetyCfg::default(),
            Some(Box::new(clock.clone())),
        )
        .expect("build");
        (shutter, motor, store, clock)
    }

    #[test]
    fn unconfigured_shutter_stays_in_reset_mode() {
        let mut shutter = build_shutter(
            SpyMotor::new(),
            SpyStore::new(),
            CourseCfg::default(),
            SafetyCfg::default(),
            None,
        )
        .expect("build");
        assert!(shutter.is_reset());
        shutter.set_level(40);
        assert_eq!(shutter.tick().expect("tick"), ShutterStatus::Reset);
        assert_eq!(shutter.target_level(), None);
    }

    #[test]
    fn first_tick_with_unknown_level_drives_up() {
        let (mut shutter, motor, _store, _clock) = fixture(10_000);
        assert_eq!(shutter.current_level(), None);
        let status = shutter.tick().expect("tick");
        assert_eq!(status, ShutterStatus::Moving(State::Resetting));
        assert_eq!(motor.ops(), vec![Op::Drive(Direction::Up)]);
    }

    #[test]
    fn down_course_defaults_to_up() {
        let (shutter, _motor, store, _clock) = fixture(8_000);
        assert_eq!(shutter.down_course_time(), 8_000);
        let persisted = StoredState::from_u64(store.last().expect("course written"));
        assert_eq!(persisted.up_course_time(), 8_000);
        assert_eq!(persisted.down_course_time(), 8_000);
        assert_eq!(persisted.level(), None);
    }
}
