use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ShutterError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("state store error: {0}")]
    Store(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("max run time of {0} ms exceeded")]
    MaxRuntime(u64),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing motor")]
    MissingMotor,
    #[error("missing state store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
