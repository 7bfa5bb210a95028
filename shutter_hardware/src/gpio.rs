//! Two-relay shutter motor on Raspberry Pi GPIO.
//!
//! One relay feeds the "up" winding, the other the "down" winding. Both must
//! never be energized together, so every direction change releases the
//! opposite relay first.

use rppal::gpio::{Gpio, OutputPin};
use shutter_traits::{BoxError, Direction, Motor};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

pub struct GpioRelay {
    up: OutputPin,
    down: OutputPin,
    active_low: bool,
}

impl GpioRelay {
    pub fn new(up_pin: u8, down_pin: u8, active_low: bool) -> Result<Self> {
        if up_pin == down_pin {
            return Err(HwError::Gpio(format!(
                "up and down relays share pin {up_pin}"
            )));
        }
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let up = gpio
            .get(up_pin)
            .map_err(|e| HwError::Gpio(format!("open relay pin {up_pin}: {e}")))?
            .into_output();
        let down = gpio
            .get(down_pin)
            .map_err(|e| HwError::Gpio(format!("open relay pin {down_pin}: {e}")))?
            .into_output();
        let mut relay = Self {
            up,
            down,
            active_low,
        };
        relay.release_all();
        debug!(up_pin, down_pin, active_low, "gpio relay ready");
        Ok(relay)
    }

    fn set(pin: &mut OutputPin, on: bool, active_low: bool) {
        if on != active_low {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }

    fn pin(&mut self, direction: Direction) -> &mut OutputPin {
        match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        }
    }

    fn release_all(&mut self) {
        Self::set(&mut self.up, false, self.active_low);
        Self::set(&mut self.down, false, self.active_low);
    }
}

impl Motor for GpioRelay {
    fn drive(&mut self, direction: Direction) -> std::result::Result<(), BoxError> {
        let active_low = self.active_low;
        Self::set(self.pin(direction.opposite()), false, active_low);
        Self::set(self.pin(direction), true, active_low);
        trace!(%direction, "relay energized");
        Ok(())
    }

    fn halt(&mut self) -> std::result::Result<(), BoxError> {
        self.release_all();
        trace!("relays released");
        Ok(())
    }
}

impl Drop for GpioRelay {
    fn drop(&mut self) {
        self.release_all();
    }
}
