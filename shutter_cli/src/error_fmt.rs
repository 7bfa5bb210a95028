//! Human-readable error descriptions and structured JSON error formatting.

use shutter_core::error::{BuildError, ShutterError};

use crate::cli::LAST_MAX_RUN_MS;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMotor => {
                "What happened: No relay was provided to the shutter.\nLikely causes: The relay driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the relay is created successfully and passed via with_motor(...).".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No state store was provided to the shutter.\nLikely causes: The state file could not be set up.\nHow to fix: Check storage.state_file in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<ShutterError>() {
        return match se {
            ShutterError::MaxRuntime(ms) => format!(
                "What happened: The move did not settle within {ms} ms; the shutter was halted and its position forgotten.\nLikely causes: Course times far too short for the real motor, or a relay that never switched.\nHow to fix: Measure the course times again and raise runner.max_run_ms if needed. The next move starts with a full reset pass."
            ),
            ShutterError::Hardware(msg) | ShutterError::HardwareFault(msg) => format!(
                "What happened: Relay command failed ({msg}).\nLikely causes: Wrong relay pins, missing GPIO permissions, or a disconnected board.\nHow to fix: Check [pins] in the config and that the process may access GPIO."
            ),
            ShutterError::Store(msg) => format!(
                "What happened: The state file could not be used ({msg}).\nLikely causes: Read-only or full filesystem.\nHow to fix: Check storage.state_file and its directory permissions."
            ),
            ShutterError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: The shutter has no course times configured.\nHow to fix: Set shutter.up_course_ms in the config."
            ),
            ShutterError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be read.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file. Original: {msg}"
        );
    }

    if lower.starts_with("parse config") || lower.contains("must be") || lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: A missing [shutter] section or out-of-range values.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    if lower.contains("open relay pins") {
        return "What happened: Failed to initialize the relay pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("state file") {
        return format!(
            "What happened: The state file is unreadable or corrupt.\nHow to fix: Run `shutter reset` to start over from an unknown position. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::MissingMotor | BuildError::MissingStore => "Build",
        };
    }
    match err.downcast_ref::<ShutterError>() {
        Some(ShutterError::MaxRuntime(_)) => "MaxRuntime",
        Some(ShutterError::Hardware(_) | ShutterError::HardwareFault(_)) => "Hardware",
        Some(ShutterError::Store(_)) => "Store",
        Some(ShutterError::State(_)) => "State",
        Some(ShutterError::Config(_)) => "InvalidConfig",
        None => "Error",
    }
}

/// Stable exit codes; clap usage errors exit with 2 on their own.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "InvalidConfig" => 3,
        "Hardware" => 4,
        "MaxRuntime" => 5,
        "State" => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = reason_name(err);
    let msg = humanize(err);
    if reason == "MaxRuntime"
        && let Some(ms) = LAST_MAX_RUN_MS.get()
    {
        return json!({ "reason": reason, "details": { "max_run_ms": ms }, "message": msg })
            .to_string();
    }
    json!({ "reason": reason, "message": msg }).to_string()
}
