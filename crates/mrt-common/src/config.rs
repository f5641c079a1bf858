//! ---
//! mrt_section: "01-core-functionality"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Shared primitives for the mission resilience runtime."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_true() -> bool {
    true
}

fn default_report_interval() -> Duration {
    Duration::from_millis(60_000)
}

fn default_critical_score_drop() -> f64 {
    15.0
}

fn default_min_acceptable_score() -> f64 {
    60.0
}

fn default_max_recovery_time() -> Duration {
    Duration::from_millis(3_600_000)
}

fn default_history_ceiling() -> usize {
    10_000
}

fn default_history_retain() -> usize {
    5_000
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9899))
}

fn default_event_log_directory() -> PathBuf {
    PathBuf::from("target/event-logs")
}

/// Top level configuration consumed by the `mrtd` daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub missions: Vec<TrackerConfig>,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "MRT_CONFIG";

    /// Load configuration from disk, respecting the `MRT_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Retrieve a mission configuration by identifier.
    pub fn mission(&self, mission_id: &str) -> Option<&TrackerConfig> {
        self.missions.iter().find(|m| m.mission_id == mission_id)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for mission in &self.missions {
            mission.validate()?;
            if !seen.insert(mission.mission_id.as_str()) {
                return Err(anyhow!(
                    "mission '{}' is declared more than once",
                    mission.mission_id
                ));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Per-mission tracker settings.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub mission_id: String,
    #[serde(default = "default_true")]
    pub enable_real_time_tracking: bool,
    /// Period of the drift recomputation timer.
    #[serde(default = "default_report_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub report_generation_interval: Duration,
    #[serde(default)]
    pub alert_thresholds: AlertThresholds,
    #[serde(default)]
    pub integrations: IntegrationToggles,
    #[serde(default)]
    pub history: HistoryLimits,
}

impl TrackerConfig {
    /// Settings for `mission_id` with every other option at its default.
    pub fn new(mission_id: impl Into<String>) -> Self {
        Self {
            mission_id: mission_id.into(),
            enable_real_time_tracking: true,
            report_generation_interval: default_report_interval(),
            alert_thresholds: AlertThresholds::default(),
            integrations: IntegrationToggles::default(),
            history: HistoryLimits::default(),
        }
    }

    pub fn with_real_time_tracking(mut self, enabled: bool) -> Self {
        self.enable_real_time_tracking = enabled;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.report_generation_interval = interval;
        self
    }

    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.alert_thresholds = thresholds;
        self
    }

    pub fn with_integrations(mut self, integrations: IntegrationToggles) -> Self {
        self.integrations = integrations;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.mission_id.trim().is_empty() {
            return Err(anyhow!("mission_id must not be empty"));
        }
        if self.enable_real_time_tracking && self.report_generation_interval.is_zero() {
            return Err(anyhow!(
                "mission '{}' enables real-time tracking with a zero report_generation_interval",
                self.mission_id
            ));
        }
        self.history.validate(&self.mission_id)?;
        Ok(())
    }
}

/// Thresholds driving the alert evaluator.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Absolute trend percentage above which a critical-drop alert fires.
    #[serde(default = "default_critical_score_drop")]
    pub critical_score_drop: f64,
    #[serde(default = "default_min_acceptable_score")]
    pub min_acceptable_score: f64,
    #[serde(default = "default_max_recovery_time")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_recovery_time: Duration,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            critical_score_drop: default_critical_score_drop(),
            min_acceptable_score: default_min_acceptable_score(),
            max_recovery_time: default_max_recovery_time(),
        }
    }
}

/// Gates for the two inbound bus subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationToggles {
    #[serde(default = "default_true")]
    pub situational_awareness: bool,
    #[serde(default = "default_true")]
    pub tactical_response: bool,
}

impl IntegrationToggles {
    pub fn any(&self) -> bool {
        self.situational_awareness || self.tactical_response
    }
}

impl Default for IntegrationToggles {
    fn default() -> Self {
        Self {
            situational_awareness: true,
            tactical_response: true,
        }
    }
}

/// Capacity bounds for the trend-point history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLimits {
    /// History length that triggers pruning.
    #[serde(default = "default_history_ceiling")]
    pub ceiling: usize,
    /// Number of most recent points kept after pruning.
    #[serde(default = "default_history_retain")]
    pub retain: usize,
}

impl HistoryLimits {
    fn validate(&self, mission_id: &str) -> Result<()> {
        if self.retain == 0 || self.retain > self.ceiling {
            return Err(anyhow!(
                "mission '{}' history.retain ({}) must be between 1 and history.ceiling ({})",
                mission_id,
                self.retain,
                self.ceiling
            ));
        }
        Ok(())
    }
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            ceiling: default_history_ceiling(),
            retain: default_history_retain(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_metrics_listen(),
        }
    }
}

/// Write-behind mirroring of recorded events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub mirror_events: bool,
    #[serde(default = "default_event_log_directory")]
    pub directory: PathBuf,
}

impl PersistenceConfig {
    /// Event log path used for a given mission.
    pub fn event_log_path(&self, mission_id: &str) -> PathBuf {
        self.directory.join(format!("{mission_id}.events.jsonl"))
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            mirror_events: false,
            directory: default_event_log_directory(),
        }
    }
}
