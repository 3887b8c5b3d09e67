/// Logger configuration derived from command-line flags
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments::get_cmd_args;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Highest level that is printed at all
    pub min_level: LogLevel,
    /// Tags with --debug-<tag>
    pub debug_tags: HashSet<String>,
    /// Tags with --verbose-<tag>
    pub verbose_tags: HashSet<String>,
    /// If non-empty, only these tags are printed (errors excepted)
    pub enabled_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub fn update_logger_config<F>(f: F)
where
    F: FnOnce(&mut LoggerConfig),
{
    f(&mut LOGGER_CONFIG.write());
}

/// Build a logger config from an argument list
pub fn config_from_args(args: &[String]) -> LoggerConfig {
    let mut config = LoggerConfig::default();

    for arg in args {
        if arg == "--verbose" {
            config.min_level = LogLevel::Verbose;
        } else if arg == "--quiet" {
            config.min_level = LogLevel::Warning;
        } else if let Some(tag) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(tag.to_string());
            if config.min_level < LogLevel::Debug {
                config.min_level = LogLevel::Debug;
            }
        } else if let Some(tag) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(tag.to_string());
            config.min_level = LogLevel::Verbose;
        } else if let Some(tags) = arg.strip_prefix("--log-tags=") {
            config.enabled_tags.extend(
                tags.split(',')
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty()),
            );
        }
    }

    config
}

/// Scan the process arguments and install the resulting config
pub fn init_from_args() {
    set_logger_config(config_from_args(&get_cmd_args()));
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = LOGGER_CONFIG.read();
    let key = tag.to_debug_key();
    config.debug_tags.contains(&key) || config.verbose_tags.contains(&key)
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().verbose_tags.contains(&tag.to_debug_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_debug_flag_enables_tag() {
        let config = config_from_args(&args(&["dashcache", "--debug-cache"]));
        assert!(config.debug_tags.contains("cache"));
        assert_eq!(config.min_level, LogLevel::Debug);
    }

    #[test]
    fn test_quiet_lowers_threshold() {
        let config = config_from_args(&args(&["dashcache", "--quiet"]));
        assert_eq!(config.min_level, LogLevel::Warning);
    }

    #[test]
    fn test_enabled_tags_list() {
        let config = config_from_args(&args(&["--log-tags=Cache, refresher"]));
        assert!(config.enabled_tags.contains("cache"));
        assert!(config.enabled_tags.contains("refresher"));
        assert_eq!(config.enabled_tags.len(), 2);
    }
}
