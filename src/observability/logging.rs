use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Settings for the process-wide log sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level, by name: `FATAL`, `CRITICAL`, `ERROR`, `WARNING`,
    /// `INFO`, `DEBUG` or `TRACE`
    pub level: String,
    /// Full `EnvFilter` directive; overrides `level` when set
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            filter: None,
        }
    }
}

/// Map a level name onto a tracing level. FATAL and CRITICAL collapse into
/// ERROR since tracing has nothing above it.
pub fn level_from_name(name: &str) -> Option<Level> {
    match name.trim().to_ascii_uppercase().as_str() {
        "FATAL" | "CRITICAL" | "ERROR" => Some(Level::ERROR),
        "WARNING" | "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    if let Some(directive) = &config.filter {
        return EnvFilter::new(directive);
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = level_from_name(&config.level).unwrap_or(Level::INFO);
    EnvFilter::new(level.as_str().to_ascii_lowercase())
}

/// Install the global subscriber. Returns `false` if one was already
/// installed, which makes repeated calls harmless.
pub fn init(config: &LogConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .try_init()
        .is_ok()
}
