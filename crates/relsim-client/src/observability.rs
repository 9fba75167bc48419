use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const ENABLED_VARS: [&str; 2] = ["RELSIM_OBSERVABILITY_ENABLED", "RELSIM_OBSERVABILITY"];
const LEVEL_VAR: &str = "RELSIM_LOG_LEVEL";
const JSON_PATH_VAR: &str = "RELSIM_JSON_LOG_PATH";
const DEFAULT_LOG_FILE: &str = "relsim.logs.jsonl";

/// Where client logs go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogSink {
    /// Nothing is installed.
    Disabled,
    /// Compact lines on stderr; stdout stays reserved for rendered results.
    Stderr,
    /// One JSON object per line appended to the file.
    JsonFile(PathBuf),
}

/// Logging settings resolved from the process environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub sink: LogSink,
    /// `RELSIM_LOG_LEVEL` directive, if set. `RUST_LOG` is consulted at install time.
    pub level: Option<String>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`. An unrecognised enable flag counts as enabled.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = ENABLED_VARS
            .iter()
            .find_map(|key| lookup(key))
            .map(|raw| parse_switch(&raw).unwrap_or(true))
            .unwrap_or(true);
        let level = lookup(LEVEL_VAR).filter(|v| !v.trim().is_empty());

        let sink = if !enabled {
            LogSink::Disabled
        } else {
            match lookup(JSON_PATH_VAR).filter(|v| !v.trim().is_empty()) {
                Some(path) => LogSink::JsonFile(PathBuf::from(path)),
                None => LogSink::Stderr,
            }
        };
        Self { sink, level }
    }

    fn filter(&self, default_level: &str) -> EnvFilter {
        if let Some(level) = &self.level
            && let Ok(filter) = EnvFilter::try_new(level)
        {
            return filter;
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    }

    fn install(&self, default_level: &str) {
        let filter = self.filter(default_level);
        match &self.sink {
            LogSink::Disabled => {}
            LogSink::Stderr => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
            }
            LogSink::JsonFile(path) => {
                let (dir, file_name) = split_log_path(path);
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
            }
        }
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Install the global subscriber once per process, from `LogSettings::from_env`.
///
/// `default_level` applies when neither `RELSIM_LOG_LEVEL` nor `RUST_LOG` is usable.
/// Later calls are no-ops.
pub fn init_observability(default_level: &str) {
    INIT.get_or_init(|| LogSettings::from_env().install(default_level));
}
