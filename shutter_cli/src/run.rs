//! Hardware assembly and command execution.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use shutter_config::Config;
use shutter_core::runner::{effective_max_run_ms, run_until_settled};
use shutter_core::{CourseCfg, DynShutter, RunParams, SafetyCfg, StoredState};
use shutter_hardware::FileStateStore;
use shutter_traits::clock::{Clock, ManualClock, MonotonicClock};
use shutter_traits::{Motor, StateStore};

use crate::cli::LAST_MAX_RUN_MS;

/// Result of a completed `move`.
#[derive(Debug, Clone, Copy)]
pub struct MoveOutcome {
    pub level: u8,
    pub elapsed_ms: u64,
    pub interrupted: bool,
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn make_motor(cfg: &Config) -> eyre::Result<Box<dyn Motor>> {
    let (Some(up), Some(down)) = (cfg.pins.relay_up, cfg.pins.relay_down) else {
        eyre::bail!("invalid configuration: pins.relay_up and pins.relay_down are required");
    };
    let relay = shutter_hardware::gpio::GpioRelay::new(up, down, cfg.pins.active_low)
        .wrap_err("open relay pins")?;
    tracing::info!(up, down, active_low = cfg.pins.active_low, "gpio relay enabled");
    Ok(Box::new(relay))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn make_motor(cfg: &Config) -> eyre::Result<Box<dyn Motor>> {
    if cfg.pins.relay_up.is_some() || cfg.pins.relay_down.is_some() {
        tracing::warn!("relay pins configured but built without the hardware feature; simulating");
    }
    Ok(Box::new(shutter_hardware::SimulatedRelay::new()))
}

fn make_store(cfg: &Config) -> FileStateStore {
    FileStateStore::new(&cfg.storage.state_file)
}

fn build(cfg: &Config, clock: Box<dyn Clock + Send + Sync>) -> eyre::Result<DynShutter> {
    let motor = make_motor(cfg)?;
    let course: CourseCfg = (&cfg.shutter).into();
    let safety: SafetyCfg = (&cfg.safety).into();
    DynShutter::builder()
        .with_motor(motor)
        .with_store(make_store(cfg))
        .with_course(course)
        .with_safety(safety)
        .with_clock(clock)
        .on_level_reached(|level| tracing::debug!(level, "level"))
        .build()
}

pub fn run_move(
    cfg: &Config,
    level: u8,
    fast: bool,
    max_run_ms_override: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<MoveOutcome> {
    // The probe shares time with the shutter's clock so elapsed time is
    // virtual under --fast.
    let (clock, probe): (Box<dyn Clock + Send + Sync>, Box<dyn Clock + Send + Sync>) = if fast {
        let c = ManualClock::new();
        (Box::new(c.clone()), Box::new(c))
    } else {
        (Box::new(MonotonicClock::new()), Box::new(MonotonicClock::new()))
    };

    let mut shutter = build(cfg, clock)?;
    let mut params: RunParams = (&cfg.runner).into();
    if let Some(ms) = max_run_ms_override {
        params.max_run_ms = ms;
    }
    let _ = LAST_MAX_RUN_MS.set(effective_max_run_ms(&shutter, params));

    if shutter.current_level().is_none() {
        tracing::info!("position unknown; a full reset pass runs first");
    }
    shutter.set_level(level);

    let start = probe.now();
    let reached = run_until_settled(&mut shutter, params, Some(&shutdown))?;
    Ok(MoveOutcome {
        level: reached,
        elapsed_ms: probe.ms_since(start),
        interrupted: shutdown.load(std::sync::atomic::Ordering::Relaxed),
    })
}

/// Persisted state, if any, without touching the relay.
pub fn read_status(cfg: &Config) -> eyre::Result<Option<StoredState>> {
    let mut store = make_store(cfg);
    let raw = store
        .load()
        .map_err(|e| eyre::eyre!("read state file {}: {e}", cfg.storage.state_file))?;
    Ok(raw.map(StoredState::from_u64))
}

/// Parse a packed state given on the command line.
pub fn decode(text: &str) -> eyre::Result<StoredState> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.len() > 20 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        eyre::bail!("expected 1 to 20 decimal digits for a packed state, got {text:?}");
    }
    let raw: u64 = trimmed
        .parse()
        .wrap_err_with(|| format!("state {trimmed} does not fit in 64 bits"))?;
    Ok(StoredState::from_u64(raw))
}

pub fn run_reset(cfg: &Config) -> eyre::Result<()> {
    let mut shutter = build(cfg, Box::new(MonotonicClock::new()))?;
    shutter.reset()
}

/// Open the relay, halt it, and read the state file.
pub fn self_check(cfg: &Config) -> eyre::Result<Option<StoredState>> {
    let mut motor = make_motor(cfg)?;
    motor
        .halt()
        .map_err(|e| eyre::Report::new(shutter_core::hw_error::map_hw_error(&*e)))
        .wrap_err("halting relay")?;
    read_status(cfg)
}
