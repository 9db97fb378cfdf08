//! Simulation-aware logging.
//!
//! Thin layer over the [`log`] crate facade that prefixes every message
//! with the current simulated time of a [`Scheduler`], so interleaved
//! component output stays attributable to a simulation instant:
//!
//! ```text
//! [T=40 INFO] producer: sent item 3
//! ```
//!
//! Use the [`log_info!`](crate::log_info), [`log_debug!`](crate::log_debug)
//! etc. macros with a scheduler handle as the first argument. Output goes
//! through whatever logger the program installs (`env_logger` in the
//! bundled demos); with no logger installed the records are discarded, so
//! instrumented model code costs nothing in silent runs.

use std::fmt::Arguments;

use colored::{Color, Colorize};

pub use log::Level;

use crate::scheduler::Scheduler;

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Blue,
        Level::Trace => Color::Magenta,
    }
}

/// Emits one record at `level` through the `log` facade, prefixed with the
/// scheduler's current time. Prefer the `log_*!` macros over calling this
/// directly.
pub fn write(sched: &Scheduler, level: Level, args: Arguments<'_>) {
    if !log::log_enabled!(level) {
        return;
    }
    let prefix = format!("[{} {}]", sched.time(), level);
    let prefix = if atty::is(atty::Stream::Stderr) {
        prefix.color(level_color(level)).to_string()
    } else {
        prefix
    };
    log::log!(level, "{} {}", prefix, args);
}

/// Logs a message at the error level, prefixed with simulated time.
///
/// The first argument is a [`Scheduler`](crate::Scheduler) handle; the rest
/// is a standard format string and arguments.
#[macro_export]
macro_rules! log_error {
    ($sched:expr, $($arg:tt)+) => {
        $crate::log::write(&$sched, $crate::log::Level::Error, format_args!($($arg)+))
    };
}

/// Logs a message at the warn level, prefixed with simulated time.
#[macro_export]
macro_rules! log_warn {
    ($sched:expr, $($arg:tt)+) => {
        $crate::log::write(&$sched, $crate::log::Level::Warn, format_args!($($arg)+))
    };
}

/// Logs a message at the info level, prefixed with simulated time.
#[macro_export]
macro_rules! log_info {
    ($sched:expr, $($arg:tt)+) => {
        $crate::log::write(&$sched, $crate::log::Level::Info, format_args!($($arg)+))
    };
}

/// Logs a message at the debug level, prefixed with simulated time.
#[macro_export]
macro_rules! log_debug {
    ($sched:expr, $($arg:tt)+) => {
        $crate::log::write(&$sched, $crate::log::Level::Debug, format_args!($($arg)+))
    };
}

/// Logs a message at the trace level, prefixed with simulated time.
#[macro_export]
macro_rules! log_trace {
    ($sched:expr, $($arg:tt)+) => {
        $crate::log::write(&$sched, $crate::log::Level::Trace, format_args!($($arg)+))
    };
}
