//! Console formatting with ANSI colors
//!
//! Lines look like `12:04:05 [CACHE     ] [WARNING] message`. Broken pipes
//! (e.g. `dashcache | head`) are ignored instead of panicking.

use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 7;

pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let time = Local::now().format("%H:%M:%S").to_string();

    let line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        format_tag(&tag),
        format_level(level),
        format_message(level, message)
    );

    print_stdout_safe(&line);
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Cache => label.bright_cyan().bold(),
        LogTag::Refresher => label.bright_green().bold(),
        LogTag::Endpoint => label.bright_magenta().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Services => label.bright_blue().bold(),
        LogTag::Webserver => label.bright_purple().bold(),
    }
}

fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.bright_yellow().bold(),
        LogLevel::Info => label.bright_green(),
        LogLevel::Debug => label.bright_blue(),
        LogLevel::Verbose => label.dimmed(),
    }
}

fn format_message(level: LogLevel, message: &str) -> ColoredString {
    match level {
        LogLevel::Error => message.red(),
        LogLevel::Warning => message.yellow(),
        LogLevel::Verbose => message.dimmed(),
        _ => message.normal(),
    }
}

fn print_stdout_safe(line: &str) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() != ErrorKind::BrokenPipe {
            eprintln!("logger write failed: {}", e);
        }
        return;
    }
    let _ = out.flush();
}
