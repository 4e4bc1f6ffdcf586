use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BalancerError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for echo")]
    Timeout,
    #[error("invalid parameter update: {0}")]
    InvalidUpdate(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("autotune failed: {0}")]
    Tune(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing actuator")]
    MissingActuator,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
