//! Maps `Box<dyn Error>` from trait boundaries to typed `ShutterError`.
//!
//! The traits in `shutter_traits` use `Box<dyn Error + Send + Sync>` so any
//! relay or storage driver can plug in; this module converts those to our
//! typed error enum, with an optional feature-gated path for
//! `shutter_hardware::error::HwError` downcasting.

use crate::error::ShutterError;

/// Map a motor error to a typed `ShutterError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to the error message.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ShutterError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<shutter_hardware::error::HwError>() {
            return ShutterError::HardwareFault(hw.to_string());
        }
    }

    ShutterError::Hardware(e.to_string())
}

/// Map a state-store error to a typed `ShutterError`.
pub fn map_store_error(e: &(dyn std::error::Error + 'static)) -> ShutterError {
    ShutterError::Store(e.to_string())
}
