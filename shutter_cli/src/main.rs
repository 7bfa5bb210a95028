#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use serde_json::json;
use shutter_config::Config;
use shutter_core::{ShutterError, StoredState};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    // Pretty reports for panics; failure to install is not fatal.
    if let Err(e) = color_eyre::install() {
        eprintln!("color-eyre unavailable: {e}");
    }

    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(&cli) {
        if cli.json {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: &Cli) -> eyre::Result<()> {
    let cfg = if cli.cmd.needs_config() {
        let cfg = shutter_config::load_path(&cli.config)
            .map_err(|e| eyre::Report::new(ShutterError::Config(e.to_string())))?;
        Some(cfg)
    } else {
        None
    };
    init_tracing(cli, cfg.as_ref());

    match &cli.cmd {
        Commands::Decode { state } => {
            let decoded = run::decode(state)?;
            print_state(cli.json, Some(&decoded));
            Ok(())
        }
        cmd => {
            let Some(cfg) = cfg.as_ref() else {
                eyre::bail!("invalid configuration: no config loaded");
            };
            dispatch(cli.json, cmd, cfg)
        }
    }
}

fn dispatch(json_out: bool, cmd: &Commands, cfg: &Config) -> eyre::Result<()> {
    match cmd {
        Commands::Move {
            level,
            fast,
            max_run_ms,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }

            let outcome = run::run_move(cfg, *level, *fast, *max_run_ms, shutdown)?;
            tracing::info!(
                level = outcome.level,
                elapsed_ms = outcome.elapsed_ms,
                interrupted = outcome.interrupted,
                "move finished"
            );
            if json_out {
                println!(
                    "{}",
                    json!({
                        "level": outcome.level,
                        "target": level,
                        "elapsed_ms": outcome.elapsed_ms,
                        "interrupted": outcome.interrupted,
                    })
                );
            } else if outcome.interrupted {
                println!("interrupted at level {}", outcome.level);
            } else {
                println!("level {}", outcome.level);
            }
            Ok(())
        }
        Commands::Status => {
            let state = run::read_status(cfg)?;
            print_state(json_out, state.as_ref());
            Ok(())
        }
        Commands::Reset => {
            run::run_reset(cfg)?;
            if json_out {
                println!("{}", json!({ "reset": true }));
            } else {
                println!("reset: position forgotten");
            }
            Ok(())
        }
        Commands::SelfCheck => {
            let state = run::self_check(cfg)?;
            let known = state.as_ref().and_then(StoredState::level);
            if json_out {
                println!(
                    "{}",
                    json!({ "ok": true, "state_file": cfg.storage.state_file, "level": known })
                );
            } else {
                println!("OK");
                match known {
                    Some(l) => println!("last level: {l}"),
                    None => println!("last level: unknown"),
                }
            }
            Ok(())
        }
        Commands::Decode { .. } => Ok(()),
    }
}

fn print_state(json_out: bool, state: Option<&StoredState>) {
    let Some(s) = state else {
        if json_out {
            println!("{}", json!({ "state": null }));
        } else {
            println!("no saved state");
        }
        return;
    };
    if json_out {
        println!(
            "{}",
            json!({
                "state": s.to_decimal(),
                "valid": s.is_valid(),
                "level": s.level(),
                "up_course_ms": s.up_course_time(),
                "down_course_ms": s.down_course_time(),
            })
        );
    } else {
        println!("state: {}", s.to_decimal());
        println!("valid: {}", s.is_valid());
        match s.level() {
            Some(l) => println!("level: {l}"),
            None => println!("level: unknown"),
        }
        println!("up_course_ms: {}", s.up_course_time());
        println!("down_course_ms: {}", s.down_course_time());
    }
}

/// Console logs go to stderr so stdout stays parseable. RUST_LOG wins over
/// --log-level, which wins over [logging].level.
fn init_tracing(cli: &Cli, cfg: Option<&Config>) {
    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.and_then(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_json = cli
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let console_text = (!cli.json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file_layer = cfg.and_then(|c| c.logging.file.as_deref()).map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "shutter.log".into(), |n| n.to_os_string());
        let appender = match cfg.and_then(|c| c.logging.rotation.as_deref()) {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_ansi(false).with_writer(writer)
    });

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_text)
        .with(file_layer)
        .try_init()
    {
        eprintln!("tracing already initialized: {e}");
    }
}
