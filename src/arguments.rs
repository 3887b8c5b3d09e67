/// Centralized command-line argument handling
///
/// Arguments are stored once in `CMD_ARGS` so any module can check flags
/// without threading them through constructors. Tests and tools may override
/// the stored list with [`set_cmd_args`].
use crate::logger::{self, LogTag};
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Default location of the TOML configuration file
pub const DEFAULT_CONFIG_PATH: &str = "data/config.toml";

pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Copy of the current arguments; falls back to env::args if the lock is poisoned
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

pub fn get_arg_value(flag: &str) -> Option<String> {
    find_arg_value(&get_cmd_args(), flag)
}

/// Value following `flag`, or the right-hand side of `flag=value`
pub fn find_arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{}=", flag);
    for (i, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
        if arg == flag {
            return args.get(i + 1).filter(|v| !v.starts_with("--")).cloned();
        }
    }
    None
}

// =============================================================================
// FLAG HELPERS
// =============================================================================

pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

pub fn is_web_disabled() -> bool {
    has_arg("--no-web")
}

/// All `--debug-*` / `--verbose*` flags present on the command line
pub fn enabled_debug_flags() -> Vec<String> {
    get_cmd_args()
        .into_iter()
        .filter(|a| a.starts_with("--debug-") || a.starts_with("--verbose"))
        .collect()
}

/// Log which debug modes are active, if any
pub fn print_debug_info() {
    let flags = enabled_debug_flags();
    if !flags.is_empty() {
        logger::info(LogTag::System, &format!("Debug modes enabled: {}", flags.join(" ")));
    }
}

/// Config file path from `--config`, or the default
pub fn get_config_path() -> String {
    get_arg_value("--config").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Port override from `--port`; ignored when it does not parse
pub fn get_port_override() -> Option<u16> {
    get_arg_value("--port").and_then(|p| p.parse().ok())
}

pub fn print_help() {
    println!("dashcache - refresh-ahead cache for dashboard data sources");
    println!();
    println!("USAGE:");
    println!("    dashcache [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>       Config file (default: {})", DEFAULT_CONFIG_PATH);
    println!("    --port <port>         Override webserver port");
    println!("    --no-web              Do not start the admin webserver");
    println!("    --quiet               Only warnings and errors");
    println!("    --verbose             Everything, including verbose traces");
    println!("    --debug-<tag>         Debug logs for one tag (cache, refresher, endpoint,");
    println!("                          config, services, webserver, system)");
    println!("    --log-tags=a,b        Only print these tags");
    println!("    -h, --help            Print this help");
}
