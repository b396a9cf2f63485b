use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Env var naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "WORLDSYNC_CONFIG";

/// Complete server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory served under /static
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Redirect target for GET /
    #[serde(default = "default_landing_page")]
    pub landing_page: String,

    /// Close sockets idle for this long (0 = never)
    #[serde(default)]
    pub idle_timeout_seconds: u64,

    /// Maximum accepted body for entity writes over HTTP
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// tracing filter used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_landing_page() -> String {
    "/static/index.html".to_string()
}

fn default_max_body_bytes() -> usize {
    1_048_576 // 1 MB
}

fn default_log_filter() -> String {
    "worldsync=info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            static_dir: default_static_dir(),
            landing_page: default_landing_page(),
            idle_timeout_seconds: 0,
            max_body_bytes: default_max_body_bytes(),
            log_filter: default_log_filter(),
        }
    }
}

impl ServerConfig {
    /// Load from `$WORLDSYNC_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => load_config_or_default(&path)?,
            Err(_) => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `WORLDSYNC_*` overrides; unparsable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("WORLDSYNC_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("WORLDSYNC_STATIC_DIR") {
            self.static_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("WORLDSYNC_IDLE_TIMEOUT_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.idle_timeout_seconds = n;
            }
        }
        if let Some(v) = lookup("WORLDSYNC_MAX_BODY_BYTES") {
            if let Ok(n) = v.parse::<usize>() {
                self.max_body_bytes = n;
            }
        }
        self
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<ServerConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ServerConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load configuration from TOML file, using defaults if the file is absent
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<ServerConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(ServerConfig::default());
    }
    load_config(path)
}
