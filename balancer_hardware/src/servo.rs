use std::time::Duration;

use crate::error::{HwError, Result};
use crate::util::servo_pulse_width;

/// Standard hobby servo frame.
const PERIOD: Duration = Duration::from_millis(20);
const MIN_PULSE: Duration = Duration::from_micros(500);
const MAX_PULSE: Duration = Duration::from_micros(2500);

/// Servo driven by software PWM on a GPIO output.
pub struct PwmServo {
    pin: rppal::gpio::OutputPin,
}

impl PwmServo {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open servo pin {pin}: {e}")))?
            .into_output();
        Ok(Self { pin })
    }

    pub fn set_position(&mut self, position_deg: f32) -> Result<()> {
        let pulse = servo_pulse_width(position_deg, MIN_PULSE, MAX_PULSE);
        self.pin
            .set_pwm(PERIOD, pulse)
            .map_err(|e| HwError::Pwm(e.to_string()))
    }
}
