//! Tagged console logging
//!
//! ```rust,ignore
//! use dashcache::logger::{self, LogTag};
//!
//! logger::warning(LogTag::Cache, "Refresh failed for price:BTC");
//! logger::debug(LogTag::Refresher, "3 entries due"); // only with --debug-refresher
//! ```
//!
//! Call [`init`] once at startup to pick up `--debug-<tag>`, `--verbose`,
//! `--verbose-<tag>`, `--quiet` and `--log-tags=a,b` from the command line.

mod config;
mod core;
mod format;
mod levels;
mod tags;

pub use config::{
    config_from_args, get_logger_config, init_from_args, set_logger_config,
    update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

pub fn init() {
    config::init_from_args();
}

/// Always shown
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Only shown with --debug-<tag>
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Only shown with --verbose or --verbose-<tag>
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

pub fn should_log(tag: LogTag, level: LogLevel) -> bool {
    core::should_log(&tag, level)
}
