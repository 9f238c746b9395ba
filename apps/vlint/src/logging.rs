//! Diagnostic logging for the vlint binary.
//!
//! Log events go to stderr through `tracing-subscriber`. Stdout carries lint
//! output and protocol messages only, so logging never interleaves with them.
//!
//! Settings are resolved in this order: command-line flags, then
//! `VLINT_LOG_LEVEL` / `VLINT_LOG_FORMAT`, then the defaults (`warn`, `auto`).
//! `RUST_LOG`, when set, replaces the level filter entirely.

use std::env;
use std::fmt;

pub const LOG_LEVEL_ENV: &str = "VLINT_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "VLINT_LOG_FORMAT";

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        };
        f.write_str(text)
    }
}

/// Logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(text)
    }
}

/// clap value parser for `--log-level`.
pub fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| {
        format!("unknown log level '{value}' (expected error, warn, info, debug or trace)")
    })
}

/// clap value parser for `--log-format`.
pub fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    LogFormat::parse(value)
        .ok_or_else(|| format!("unknown log format '{value}' (expected auto, text or json)"))
}

/// Effective log configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    pub const DEFAULT: Self = Self {
        format: LogFormat::Auto,
        level: LogLevel::Warn,
    };

    /// Defaults overridden by the environment, then by `format`/`level`.
    #[must_use]
    pub fn resolve(format: Option<LogFormat>, level: Option<LogLevel>) -> Self {
        let env_format = env::var(LOG_FORMAT_ENV).ok();
        let env_level = env::var(LOG_LEVEL_ENV).ok();
        let base = apply_env_overrides(Self::DEFAULT, env_format.as_deref(), env_level.as_deref());
        Self {
            format: format.unwrap_or(base.format),
            level: level.unwrap_or(base.level),
        }
    }

    #[must_use]
    pub fn resolved(self) -> Self {
        let format = match self.format {
            LogFormat::Auto => LogFormat::Text,
            other => other,
        };
        Self { format, ..self }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Applies environment strings to `base`; unparseable values are ignored.
fn apply_env_overrides(base: LogOptions, format: Option<&str>, level: Option<&str>) -> LogOptions {
    LogOptions {
        format: format.and_then(LogFormat::parse).unwrap_or(base.format),
        level: level.and_then(LogLevel::parse).unwrap_or(base.level),
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(options: LogOptions) {
    use std::io::IsTerminal;
    use std::sync::OnceLock;
    use tracing_subscriber::{EnvFilter, fmt};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    let _ = INITIALISED.get_or_init(|| {
        let options = options.resolved();
        let use_ansi = env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(options.level.to_string()));

        let builder = fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_names(false);

        match options.format {
            LogFormat::Json => {
                let subscriber = builder.with_ansi(false).json().finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
            }
            _ => {
                let subscriber = builder.with_ansi(use_ansi).compact().finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
            }
        }
    });
}
