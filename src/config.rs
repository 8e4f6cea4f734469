use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub scheduler: SchedulerConfig,

    pub backlog: BacklogConfig,

    pub torznab: TorznabConfig,

    pub qbittorrent: QBittorrentConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Event bus buffer size (default: 100)
    pub event_bus_buffer_size: usize,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/backlogarr.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            event_bus_buffer_size: 100,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// How often the scheduler considers starting a backlog pass.
    pub backlog_frequency_minutes: u32,

    /// Overrides the interval trigger when set.
    pub cron_expression: Option<String>,

    pub tick_seconds: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backlog_frequency_minutes: 21,
            cron_expression: None,
            tick_seconds: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacklogConfig {
    /// Days between full passes.
    pub cycle_days: u32,

    /// Look-back window of the narrow pass.
    pub recent_days: u32,

    /// Never search season packs when set.
    pub prefer_episode_releases: bool,
}

impl Default for BacklogConfig {
    fn default() -> Self {
        Self {
            cycle_days: 7,
            recent_days: 7,
            prefer_episode_releases: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TorznabConfig {
    pub enabled: bool,

    pub name: String,

    pub url: String,

    pub api_key: String,

    pub categories: Vec<u32>,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u32,
}

impl Default for TorznabConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: "torznab".to_string(),
            url: "http://localhost:9117/api/v2.0/indexers/all/results/torznab".to_string(),
            api_key: String::new(),
            categories: vec![5000],
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QBittorrentConfig {
    pub enabled: bool,

    pub url: String,

    pub username: String,

    pub password: String,

    pub default_category: String,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8080".to_string(),
            username: "change-me".to_string(),
            password: "change-me".to_string(),
            default_category: "tv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub metrics_port: Option<u16>,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = HashMap::new();
        labels.insert("app".to_string(), "backlogarr".to_string());

        Self {
            metrics_enabled: true,
            metrics_port: None,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("backlogarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".backlogarr").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.qbittorrent.enabled && self.qbittorrent.url.is_empty() {
            anyhow::bail!("qBittorrent URL cannot be empty when enabled");
        }

        if self.torznab.enabled && self.torznab.url.is_empty() {
            anyhow::bail!("Torznab URL cannot be empty when enabled");
        }

        if self.scheduler.enabled
            && self.scheduler.backlog_frequency_minutes == 0
            && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Backlog frequency must be > 0 or cron expression must be set");
        }

        if self.backlog.cycle_days == 0 {
            anyhow::bail!("Backlog cycle must be at least one day");
        }

        if !matches!(self.general.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "Unknown log format '{}', expected \"pretty\" or \"json\"",
                self.general.log_format
            );
        }

        Ok(())
    }
}
