//! Utility modules

pub mod error;
pub mod logging;

pub use error::{GameError, Result, TablesyncError};
pub use logging::{
    init_default_logging, init_env_logging, init_logging, LogConfig, LogFormat, LogLevel,
};
