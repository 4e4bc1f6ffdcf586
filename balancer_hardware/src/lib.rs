pub mod error;
#[cfg(feature = "hardware")]
pub mod hcsr04;
#[cfg(feature = "hardware")]
pub mod servo;
pub mod sim;
pub mod util;

pub use sim::{BeamParams, SimulatedBeam};

#[cfg(feature = "hardware")]
pub use hardware::{HardwareRanger, HardwareServo};

#[cfg(feature = "hardware")]
pub mod hardware {
    use balancer_traits::{Actuator, Ranger};

    use crate::error::HwError;
    use crate::hcsr04::HcSr04;
    use crate::servo::PwmServo;

    /// HC-SR04 on two GPIO lines.
    pub struct HardwareRanger {
        sensor: HcSr04,
    }

    impl HardwareRanger {
        pub fn try_new(trigger_pin: u8, echo_pin: u8) -> Result<Self, HwError> {
            Ok(Self {
                sensor: HcSr04::new(trigger_pin, echo_pin)?,
            })
        }
    }

    impl Ranger for HardwareRanger {
        fn echo(
            &mut self,
            timeout: std::time::Duration,
        ) -> Result<std::time::Duration, Box<dyn std::error::Error + Send + Sync>> {
            // Single shot: the control loop decides what to do with a miss.
            self.sensor.ping(timeout).map_err(|e| {
                tracing::debug!(error = %e, "hc-sr04 miss");
                Box::new(e) as Box<dyn std::error::Error + Send + Sync>
            })
        }
    }

    /// Servo on a software-PWM GPIO line.
    pub struct HardwareServo {
        servo: PwmServo,
        faults: u64,
    }

    impl HardwareServo {
        pub fn try_new(pin: u8) -> Result<Self, HwError> {
            Ok(Self {
                servo: PwmServo::new(pin)?,
                faults: 0,
            })
        }

        /// Number of PWM updates that failed since start.
        pub fn faults(&self) -> u64 {
            self.faults
        }
    }

    impl Actuator for HardwareServo {
        fn apply(&mut self, position_deg: f32) {
            if let Err(e) = self.servo.set_position(position_deg) {
                self.faults = self.faults.saturating_add(1);
                tracing::warn!(error = %e, position_deg, faults = self.faults, "servo update failed");
            }
        }
    }
}
