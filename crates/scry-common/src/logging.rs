//! Logging configuration for Scry
//!
//! All components log through `tracing`. Hosts get console output on stderr;
//! the injected agent logs to a per-pid file because the target process owns
//! stderr.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Handle to the active log file, shared by all file-layer writers.
static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// Logging configuration, loadable from the `[logging]` table of a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log to stderr
    #[serde(default = "default_true")]
    pub console_enabled: bool,

    /// Log to a file
    #[serde(default)]
    pub file_enabled: bool,

    /// Log file path
    #[serde(default)]
    pub file_path: String,

    /// Include the module target in each line
    #[serde(default = "default_true")]
    pub show_target: bool,

    /// Log level ("trace".."error")
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_enabled: false,
            file_path: String::new(),
            show_target: true,
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// File-only configuration, used inside a target process.
    pub fn file_only(path: &str) -> Self {
        Self {
            console_enabled: false,
            file_enabled: true,
            file_path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }
}

fn file_writer() -> Box<dyn Write + Send> {
    if let Ok(guard) = LOG_FILE.lock() {
        if let Some(ref file) = *guard {
            if let Ok(clone) = file.try_clone() {
                return Box::new(clone);
            }
        }
    }
    Box::new(std::io::sink())
}

/// Initialize the global subscriber from a configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.file_enabled && !config.file_path.is_empty() {
        if let Ok(file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file_path)
        {
            if let Ok(mut guard) = LOG_FILE.lock() {
                *guard = Some(file);
            }
        }
    }

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(config.show_target)
            .with_writer(std::io::stderr)
    });

    let file_layer = (config.file_enabled && !config.file_path.is_empty()).then(|| {
        fmt::layer()
            .with_ansi(false)
            .with_target(config.show_target)
            .with_writer(file_writer)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Initialize logging for the in-process agent.
///
/// Writes to `scry-agent-{pid}.log` in the target's working directory; the
/// pid suffix keeps concurrent instrumented processes from clobbering each
/// other.
pub fn init_agent_logging() {
    let mut path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    path.push(format!("scry-agent-{}.log", std::process::id()));

    init_logging(&LogConfig::file_only(&path.to_string_lossy()));
}

/// Initialize console logging for a controller host.
pub fn init_host_logging() {
    init_logging(&LogConfig::default());
}

/// Initialize logging from a TOML config file with a `[logging]` table.
pub fn init_logging_from_file(path: &str) -> std::result::Result<(), String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

    #[derive(Deserialize)]
    struct ConfigWrapper {
        #[serde(default)]
        logging: LogConfig,
    }

    let wrapper: ConfigWrapper =
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))?;

    init_logging(&wrapper.logging);
    Ok(())
}
