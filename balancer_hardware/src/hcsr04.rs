use std::time::Duration;
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::measure_high_pulse;

/// Trigger pulse width required by the HC-SR04.
const TRIGGER_PULSE: Duration = Duration::from_micros(10);

pub struct HcSr04 {
    trigger: rppal::gpio::OutputPin,
    echo: rppal::gpio::InputPin,
}

impl HcSr04 {
    pub fn new(trigger_pin: u8, echo_pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut trigger = gpio
            .get(trigger_pin)
            .map_err(|e| HwError::Gpio(format!("open trigger pin {trigger_pin}: {e}")))?
            .into_output();
        let echo = gpio
            .get(echo_pin)
            .map_err(|e| HwError::Gpio(format!("open echo pin {echo_pin}: {e}")))?
            .into_input();
        trigger.set_low(); // idle low
        Ok(Self { trigger, echo })
    }

    /// Fire one ranging burst and time the echo pulse.
    pub fn ping(&mut self, timeout: Duration) -> Result<Duration> {
        self.trigger.set_low();
        spin_for(Duration::from_micros(2));
        self.trigger.set_high();
        spin_for(TRIGGER_PULSE);
        self.trigger.set_low();

        let echo = &self.echo;
        let width = measure_high_pulse(|| echo.is_high(), timeout, Duration::ZERO)?;
        trace!(echo_us = width.as_micros() as u64, "hc-sr04 echo");
        Ok(width)
    }
}

#[inline]
fn spin_for(d: Duration) {
    let until = std::time::Instant::now() + d;
    while std::time::Instant::now() < until {
        std::hint::spin_loop();
    }
}
