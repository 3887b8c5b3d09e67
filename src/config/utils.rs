/// Configuration utilities: loading, validation, and global access
///
/// The loaded config lives in a process-wide `RwLock` so the binary and the
/// webserver can read it; library users can also ignore the global entirely
/// and pass a `Config` they built themselves.
use super::schemas::{section_field_names, Config};
use crate::errors::{CacheError, CacheResult};
use crate::logger::{self, LogTag};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::path::Path;

static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

/// Parse and validate a TOML document
pub fn parse_config(contents: &str) -> CacheResult<Config> {
    let config: Config = toml::from_str(contents)
        .map_err(|e| CacheError::Config(format!("Failed to parse config: {}", e)))?;

    for key in unknown_keys(contents)? {
        logger::warning(LogTag::Config, &format!("Ignoring unknown config key '{}'", key));
    }

    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from `path` and install it globally
///
/// A missing file is not an error: defaults are used and a warning logged.
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> CacheResult<Config> {
    let path = path.as_ref();
    let config = if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        parse_config(&contents)?
    } else {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path.display()),
        );
        Config::default()
    };

    *CONFIG.write() = config.clone();
    logger::debug(LogTag::Config, &format!("Configuration loaded from {}", path.display()));
    Ok(config)
}

/// Re-read `path` and replace the global config; the file must exist
pub fn reload_config_from_path<P: AsRef<Path>>(path: P) -> CacheResult<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config = parse_config(&contents)?;
    *CONFIG.write() = config.clone();
    Ok(config)
}

/// Read access to the global configuration
///
/// ```ignore
/// let port = with_config(|cfg| cfg.webserver.port);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    f(&CONFIG.read())
}

pub fn get_config() -> Config {
    CONFIG.read().clone()
}

pub fn validate_config(config: &Config) -> CacheResult<()> {
    let refresher = &config.refresher;
    if refresher.tick_interval_ms == 0 {
        return Err(CacheError::Config("refresher.tick_interval_ms must be positive".to_string()));
    }
    if !(refresher.early_refresh_ratio > 0.0 && refresher.early_refresh_ratio <= 1.0) {
        return Err(CacheError::Config(format!(
            "refresher.early_refresh_ratio must be in (0, 1], got {}",
            refresher.early_refresh_ratio
        )));
    }

    let alpha = config.cache.latency_ema_alpha;
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(CacheError::Config(format!(
            "cache.latency_ema_alpha must be in (0, 1], got {}",
            alpha
        )));
    }

    if let Some((data_type, _)) = config.cache.refresh_intervals.iter().find(|(_, secs)| **secs == 0) {
        return Err(CacheError::Config(format!(
            "cache.refresh_intervals.{} must be positive",
            data_type
        )));
    }

    Ok(())
}

/// Keys present in the document that no config section knows about
pub fn unknown_keys(contents: &str) -> CacheResult<Vec<String>> {
    let document: toml::Table = contents
        .parse()
        .map_err(|e| CacheError::Config(format!("Failed to parse config: {}", e)))?;
    let sections = section_field_names();
    let mut unknown = Vec::new();

    for (section, value) in &document {
        let Some(fields) = sections.get(section.as_str()) else {
            unknown.push(section.clone());
            continue;
        };
        if let Some(table) = value.as_table() {
            for key in table.keys() {
                if !fields.contains(&key.as_str()) {
                    unknown.push(format!("{}.{}", section, key));
                }
            }
        }
    }

    Ok(unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_empty() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache.lock_timeout_ms, 100);
        assert_eq!(config.refresher.shutdown_timeout_ms, 5000);
        assert!((config.refresher.early_refresh_ratio - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
            [cache.refresh_intervals]
            price = 30

            [webserver]
            port = 9100
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.refresh_intervals.get("price"), Some(&30));
        assert_eq!(config.webserver.port, 9100);
        assert_eq!(config.webserver.host, "127.0.0.1");
        assert!(config.refresher.enabled);
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let err = parse_config("[refresher]\nearly_refresh_ratio = 1.5\n").unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = parse_config("[cache.refresh_intervals]\nnews = 0\n").unwrap_err();
        assert!(err.to_string().contains("news"));
    }

    #[test]
    fn test_unknown_keys_reported() {
        let keys = unknown_keys("[refresher]\ntick_ms = 5\n[metrics]\nenabled = true\n").unwrap();
        assert_eq!(keys, vec!["metrics".to_string(), "refresher.tick_ms".to_string()]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[refresher]\ntick_interval_ms = 250").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.refresher.tick_interval_ms, 250);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.webserver.port, 8080);
    }
}
