//! Maps `Box<dyn Error>` from trait boundaries to typed `BalancerError`.
//!
//! The traits in `balancer_traits` use `Box<dyn Error + Send + Sync>`; this
//! module classifies those for logging and statistics, with an optional
//! feature-gated path for `balancer_hardware::HwError` downcasting.

use crate::error::BalancerError;

/// Map a trait-boundary error to a typed `BalancerError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> BalancerError {
    #[cfg(feature = "hardware-errors")]
    {
        use balancer_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::EchoStartTimeout | HwError::EchoTimeout => BalancerError::Timeout,
                other => BalancerError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        BalancerError::Timeout
    } else {
        BalancerError::Hardware(s)
    }
}
