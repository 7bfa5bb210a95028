#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the shutter controller.
//!
//! `Config` and its sections are deserialized from TOML and checked by
//! `Config::validate`. Only `[shutter]` is mandatory; every other section
//! falls back to defaults.
use serde::Deserialize;

/// Largest course time the stored-state encoding can hold (26 bits).
pub const MAX_COURSE_MS: u32 = (1 << 26) - 1;

#[derive(Debug, Deserialize)]
pub struct ShutterCfg {
    /// Time for a full 100 -> 0 traversal (ms).
    pub up_course_ms: u32,
    /// Time for a full 0 -> 100 traversal (ms). Absent or 0 means same as up.
    #[serde(default)]
    pub down_course_ms: u32,
    /// Fraction of course time driven past an endpoint to seat the shutter.
    #[serde(default = "default_calibration_ratio")]
    pub calibration_ratio: f32,
}

fn default_calibration_ratio() -> f32 {
    0.1
}

impl ShutterCfg {
    /// Down course time with the "same as up" default applied.
    pub fn effective_down_course_ms(&self) -> u32 {
        if self.down_course_ms == 0 {
            self.up_course_ms
        } else {
            self.down_course_ms
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Cool-down after every halt before the relays may switch again (ms).
    pub delay_ms: u64,
}

impl Default for Safety {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Period between two ticks of the state machine (ms).
    pub tick_ms: u64,
    /// Hard cap on a single move (ms). 0 derives it from the course times.
    pub max_run_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            max_run_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Storage {
    /// File holding the packed state as a 20-digit decimal line.
    pub state_file: String,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            state_file: "var/shutter.state".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Pins {
    pub relay_up: Option<u8>,
    pub relay_down: Option<u8>,
    /// Relay boards that switch on a low input.
    #[serde(default)]
    pub active_low: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub shutter: ShutterCfg,
    #[serde(default)]
    pub safety: Safety,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_path(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Shutter
        if self.shutter.up_course_ms == 0 {
            eyre::bail!("shutter.up_course_ms must be > 0");
        }
        if self.shutter.up_course_ms > MAX_COURSE_MS {
            eyre::bail!("shutter.up_course_ms must be <= {MAX_COURSE_MS}");
        }
        if self.shutter.down_course_ms > MAX_COURSE_MS {
            eyre::bail!("shutter.down_course_ms must be <= {MAX_COURSE_MS}");
        }
        let ratio = self.shutter.calibration_ratio;
        if !(ratio.is_finite() && ratio > 0.0 && ratio <= 1.0) {
            eyre::bail!("shutter.calibration_ratio must be in (0.0, 1.0]");
        }

        // Safety
        if self.safety.delay_ms > 60 * 1000 {
            eyre::bail!("safety.delay_ms is unreasonably large (>60s)");
        }

        // Runner
        if self.runner.tick_ms == 0 {
            eyre::bail!("runner.tick_ms must be >= 1");
        }
        let min_step = self
            .shutter
            .up_course_ms
            .min(self.shutter.effective_down_course_ms())
            / 100;
        if self.runner.tick_ms > u64::from(min_step.max(1)) {
            eyre::bail!("runner.tick_ms must not exceed one level step ({min_step} ms)");
        }

        // Storage
        if self.storage.state_file.trim().is_empty() {
            eyre::bail!("storage.state_file must not be empty");
        }

        // Pins
        if let (Some(up), Some(down)) = (self.pins.relay_up, self.pins.relay_down)
            && up == down
        {
            eyre::bail!("pins.relay_up and pins.relay_down must differ");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = load_toml("[shutter]\nup_course_ms = 10000\n").expect("parse");
        assert_eq!(cfg.shutter.effective_down_course_ms(), 10000);
        assert!((cfg.shutter.calibration_ratio - 0.1).abs() < f32::EPSILON);
        assert_eq!(cfg.safety.delay_ms, 1000);
        assert_eq!(cfg.runner.tick_ms, 10);
        assert_eq!(cfg.storage.state_file, "var/shutter.state");
        assert!(cfg.pins.relay_up.is_none());
        cfg.validate().expect("defaults are valid");
    }
}
