// pipewright-core/src/logging.rs
// Lightweight stderr logging with a process-wide level, no logger crate needed

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV_VAR: &str = "PIPEWRIGHT_LOG";

/// Log levels, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Nothing is printed
    Off = 0,
    /// Failures surfaced to the caller
    Error = 1,
    /// Suspicious but recoverable situations (e.g. a rejected stage)
    Warn = 2,
    /// Client lifecycle: open, shutdown
    Info = 3,
    /// Stage creation, merges, store calls
    Debug = 4,
    /// Full payloads
    Trace = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "OFF",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(raw: u8) -> LogLevel {
        match raw {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Warn,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    /// Case-insensitive; accepts `warning` as an alias of `warn`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// Default: WARN
static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);

pub fn set_log_level(level: LogLevel) {
    GLOBAL_LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn get_log_level() -> LogLevel {
    LogLevel::from_u8(GLOBAL_LOG_LEVEL.load(Ordering::Relaxed))
}

/// Apply the level named by `PIPEWRIGHT_LOG`, if set and valid.
///
/// Returns the level that is active afterwards.
pub fn init_from_env() -> LogLevel {
    if let Ok(raw) = std::env::var(LOG_ENV_VAR) {
        match raw.parse::<LogLevel>() {
            Ok(level) => set_log_level(level),
            Err(msg) => log_message(LogLevel::Warn, module_path!(), &format!("{}: {}", LOG_ENV_VAR, msg)),
        }
    }
    get_log_level()
}

#[inline]
pub fn should_log(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= get_log_level()
}

#[doc(hidden)]
pub fn log_message(level: LogLevel, module: &str, message: &str) {
    if should_log(level) {
        eprintln!("[{:<5}] {}: {}", level.as_str(), module, message);
    }
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log_message(
            $crate::logging::LogLevel::Error,
            module_path!(),
            &format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log_message(
            $crate::logging::LogLevel::Warn,
            module_path!(),
            &format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log_message(
            $crate::logging::LogLevel::Info,
            module_path!(),
            &format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log_message(
            $crate::logging::LogLevel::Debug,
            module_path!(),
            &format!($($arg)*)
        )
    };
}

/// Trace-level log; the format arguments are only evaluated when trace is on.
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        if $crate::logging::should_log($crate::logging::LogLevel::Trace) {
            $crate::logging::log_message(
                $crate::logging::LogLevel::Trace,
                module_path!(),
                &format!($($arg)*)
            )
        }
    };
}
