// ABOUTME: Logging configuration and structured logging setup for observability
// ABOUTME: Configures log level, output format, and the global tracing subscriber
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Colloquy Contributors

//! Structured logging configuration with environment-driven output formats

use anyhow::Result;
use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    /// `JSON` format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level directive (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };

        Self {
            level,
            format,
            include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if the tracing subscriber fails to initialize
    pub fn init(&self) -> Result<()> {
        // Keep HTTP internals quiet unless explicitly requested
        let env_filter = EnvFilter::new(&self.level)
            .add_directive("hyper=warn".parse()?)
            .add_directive("reqwest=warn".parse()?)
            .add_directive("sqlx=warn".parse()?);

        let registry = tracing_subscriber::registry().with(env_filter);

        match self.format {
            LogFormat::Json => {
                registry
                    .with(
                        fmt::layer()
                            .json()
                            .with_file(self.include_location)
                            .with_line_number(self.include_location),
                    )
                    .try_init()?;
            }
            LogFormat::Pretty => {
                registry
                    .with(
                        fmt::layer()
                            .pretty()
                            .with_file(self.include_location)
                            .with_line_number(self.include_location),
                    )
                    .try_init()?;
            }
            LogFormat::Compact => {
                registry
                    .with(
                        fmt::layer()
                            .compact()
                            .with_file(self.include_location)
                            .with_line_number(self.include_location),
                    )
                    .try_init()?;
            }
        }

        Ok(())
    }
}
