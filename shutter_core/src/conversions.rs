//! `From` implementations bridging `shutter_config` types to `shutter_core` types.

use crate::config::{CourseCfg, RunParams, SafetyCfg};

impl From<&shutter_config::ShutterCfg> for CourseCfg {
    fn from(c: &shutter_config::ShutterCfg) -> Self {
        Self {
            up_course_ms: c.up_course_ms,
            down_course_ms: c.down_course_ms,
            calibration_ratio: c.calibration_ratio,
        }
    }
}

impl From<&shutter_config::Safety> for SafetyCfg {
    fn from(c: &shutter_config::Safety) -> Self {
        Self {
            delay_ms: c.delay_ms,
        }
    }
}

impl From<&shutter_config::RunnerCfg> for RunParams {
    fn from(c: &shutter_config::RunnerCfg) -> Self {
        Self {
            tick_ms: c.tick_ms,
            max_run_ms: c.max_run_ms,
        }
    }
}
