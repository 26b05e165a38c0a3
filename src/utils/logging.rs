//! Logging configuration and utilities for tablesync
//!
//! This module provides the logging bootstrap using the `tracing`
//! framework: configurable level and output format, with optional
//! environment-variable overrides.

use std::env;

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and info messages
    Info,
    /// Error, warning, info, and debug messages
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// Compact format for production
    Compact,
    /// JSON format for structured logging
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Whether to include file and line information
    pub include_location: bool,
    /// Custom filter for modules
    pub module_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            include_location: false,
            module_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable location information
    pub fn with_location(mut self, include_location: bool) -> Self {
        self.include_location = include_location;
        self
    }

    /// Set a custom module filter
    pub fn with_module_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.module_filter = Some(filter.into());
        self
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level_str) = env::var("TABLESYNC_LOG_LEVEL") {
            config.level = match level_str.to_lowercase().as_str() {
                "error" => LogLevel::Error,
                "warn" | "warning" => LogLevel::Warn,
                "info" => LogLevel::Info,
                "debug" => LogLevel::Debug,
                "trace" => LogLevel::Trace,
                _ => LogLevel::Info,
            };
        }

        if let Ok(format_str) = env::var("TABLESYNC_LOG_FORMAT") {
            config.format = match format_str.to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            };
        }

        if let Ok(location_str) = env::var("TABLESYNC_LOG_LOCATION") {
            config.include_location = location_str.to_lowercase() == "true";
        }

        if let Ok(filter) = env::var("TABLESYNC_LOG_FILTER") {
            config.module_filter = Some(filter);
        }

        config
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: LogConfig) -> crate::Result<()> {
    let level_filter: tracing_subscriber::filter::LevelFilter = config.level.into();
    let mut filter = EnvFilter::from_default_env().add_directive(level_filter.into());

    if let Some(module_filter) = &config.module_filter {
        filter = filter.add_directive(module_filter.parse().map_err(|e| {
            crate::TablesyncError::config("log_filter", format!("Invalid filter: {}", e))
        })?);
    }

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
    }

    tracing::info!(
        level = ?config.level,
        format = ?config.format,
        "logging system initialized"
    );

    Ok(())
}

/// Initialize logging with default configuration
pub fn init_default_logging() -> crate::Result<()> {
    init_logging(LogConfig::default())
}

/// Initialize logging from environment variables
pub fn init_env_logging() -> crate::Result<()> {
    init_logging(LogConfig::from_env())
}
