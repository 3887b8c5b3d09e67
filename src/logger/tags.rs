/// Log tags identify the subsystem a message comes from
///
/// Each tag maps to a `--debug-<key>` / `--verbose-<key>` command-line flag.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Cache,
    Refresher,
    Endpoint,
    Config,
    Services,
    Webserver,
}

impl LogTag {
    /// Key used in `--debug-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system",
            LogTag::Cache => "cache",
            LogTag::Refresher => "refresher",
            LogTag::Endpoint => "endpoint",
            LogTag::Config => "config",
            LogTag::Services => "services",
            LogTag::Webserver => "webserver",
        }
        .to_string()
    }

    /// Uppercase label without colors
    pub fn to_plain_string(&self) -> String {
        self.to_debug_key().to_uppercase()
    }

    pub fn all() -> &'static [LogTag] {
        &[
            LogTag::System,
            LogTag::Cache,
            LogTag::Refresher,
            LogTag::Endpoint,
            LogTag::Config,
            LogTag::Services,
            LogTag::Webserver,
        ]
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
