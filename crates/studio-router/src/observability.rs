//! Process-wide `tracing` setup for the studio and its CLI.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const DEFAULT_LOG_FILE: &str = "studio.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log lines go once the subscriber is installed.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogSink {
    /// Compact lines on stderr, leaving stdout for command output.
    Console,
    /// JSON lines appended to a file.
    JsonFile(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LogSettings {
    enabled: bool,
    filter: String,
    sink: LogSink,
}

impl LogSettings {
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = get("STUDIO_OBSERVABILITY_ENABLED")
            .and_then(|value| parse_bool(&value))
            .unwrap_or(true);
        let filter = get("STUDIO_LOG_LEVEL")
            .filter(|level| EnvFilter::try_new(level).is_ok())
            .or_else(|| get("RUST_LOG"))
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        let sink = match get("STUDIO_JSON_LOG_PATH") {
            Some(path) if !path.trim().is_empty() => LogSink::JsonFile(PathBuf::from(path)),
            _ => LogSink::Console,
        };
        Self {
            enabled,
            filter,
            sink,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

// Splits a log path into the directory and file name the appender wants.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file)
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `STUDIO_OBSERVABILITY_ENABLED`: enable/disable flag (default enabled).
/// - `STUDIO_LOG_LEVEL`: level or filter directive, checked before `RUST_LOG`.
/// - `STUDIO_JSON_LOG_PATH`: write JSON lines, including the `generate` span
///   and its `request_id`, to this file instead of stderr.
///
/// Both sinks record the close of each `generate` span, so every request logs
/// its duration next to its `request_id`.
pub fn init_observability() {
    INIT.get_or_init(|| {
        install(LogSettings::from_lookup(|key| std::env::var(key).ok()));
    });
}

fn install(settings: LogSettings) {
    if !settings.enabled {
        return;
    }
    let filter = settings.env_filter();
    match settings.sink {
        LogSink::JsonFile(path) => {
            let (dir, file) = split_log_path(&path);
            let _ = std::fs::create_dir_all(&dir);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_writer(tracing_appender::rolling::never(dir, file));
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
        LogSink::Console => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_writer(std::io::stderr);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init();
        }
    }
}
