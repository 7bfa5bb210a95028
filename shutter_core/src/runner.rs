use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use shutter_traits::clock::Clock;
use shutter_traits::{Motor, StateStore};

use crate::config::RunParams;
use crate::error::{Result, ShutterError};
use crate::shutter::Shutter;
use crate::status::ShutterStatus;
use crate::util::default_max_run_ms;

/// Effective cap for one run: the configured value, or one derived from the
/// shutter's course times when `params.max_run_ms` is 0.
pub fn effective_max_run_ms<M: Motor, S: StateStore>(
    shutter: &Shutter<M, S>,
    params: RunParams,
) -> u64 {
    if params.max_run_ms > 0 {
        return params.max_run_ms;
    }
    default_max_run_ms(
        shutter.up_course_time(),
        shutter.down_course_time(),
        shutter.calibration_ratio(),
        shutter.safety.delay_ms,
    )
}

/// Tick `shutter` every `params.tick_ms` until it settles, returning the final level.
///
/// Sleeps through the shutter's own clock, so a virtual clock runs the whole
/// move instantly. When `shutdown` becomes true the pending request is
/// dropped and the shutter settles at the next integral level. If the run
/// exceeds its cap the shutter is reset (halted, position forgotten).
pub fn run_until_settled<M, S>(
    shutter: &mut Shutter<M, S>,
    params: RunParams,
    shutdown: Option<&AtomicBool>,
) -> Result<u8>
where
    M: Motor,
    S: StateStore,
{
    if shutter.is_reset() {
        return Err(eyre::Report::new(ShutterError::State(
            "shutter is not configured".into(),
        )));
    }

    let max_run_ms = effective_max_run_ms(shutter, params);
    let tick = Duration::from_millis(params.tick_ms.max(1));
    let clock = shutter.clock.clone();
    let start = clock.now();

    tracing::info!(
        target = ?shutter.target_level(),
        level = ?shutter.current_level(),
        max_run_ms,
        "run start"
    );

    loop {
        if shutdown.is_some_and(|f| f.load(Ordering::Relaxed)) {
            shutter.stop();
            if shutter.is_idle() {
                tracing::info!(level = ?shutter.current_level(), "run interrupted");
                return shutter.current_level().ok_or_else(|| {
                    eyre::Report::new(ShutterError::State(
                        "interrupted while the level was unknown".into(),
                    ))
                });
            }
        }

        match shutter.tick()? {
            status if status.is_settled() => {
                let level = shutter.current_level().ok_or_else(|| {
                    eyre::Report::new(ShutterError::State("settled without a level".into()))
                })?;
                tracing::info!(level, "run complete");
                return Ok(level);
            }
            ShutterStatus::Reset => {
                return Err(eyre::Report::new(ShutterError::State(
                    "shutter was reset during the run".into(),
                )));
            }
            _ => {}
        }

        if clock.ms_since(start) >= max_run_ms {
            tracing::error!(max_run_ms, "max run time exceeded, resetting shutter");
            if let Err(e) = shutter.reset() {
                tracing::warn!(error = %e, "halt failed after max run time");
            }
            return Err(eyre::Report::new(ShutterError::MaxRuntime(max_run_ms)));
        }

        clock.sleep(tick);
    }
}
