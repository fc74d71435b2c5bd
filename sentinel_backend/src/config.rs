use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::SourceKind;
use crate::prompt;

const CONFIG_FILE_NAME: &str = "sentinel.toml";

const ALERT_MIN_POINTS: u64 = 100;
const ALERT_MAX_RESULTS: u32 = 20;
const TRENDS_MAX_RESULTS: u32 = 50;

/// Which flavour of report a loop produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Severity-grouped alert report.
    #[default]
    Alerts,
    /// Daily digest of the most popular stories.
    Trends,
}

impl ReportKind {
    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Alerts => "Sentinel Alert Report",
            ReportKind::Trends => "Hacker News Daily Report",
        }
    }

    pub fn file_prefix(self) -> &'static str {
        match self {
            ReportKind::Alerts => "sentinel_report",
            ReportKind::Trends => "hn_report",
        }
    }

    pub fn role_prompt(self) -> &'static str {
        match self {
            ReportKind::Alerts => prompt::ALERT_ANALYST_PROMPT,
            ReportKind::Trends => prompt::TRENDS_ANALYST_PROMPT,
        }
    }
}

impl FromStr for ReportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alerts" => Ok(ReportKind::Alerts),
            "trends" => Ok(ReportKind::Trends),
            other => Err(ConfigError::InvalidValue {
                field: "report_kind",
                reason: format!("expected 'alerts' or 'trends', got '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" (hosted chat-completion API) or "ollama" (local server)
    #[serde(default = "default_llm_backend")]
    pub backend: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Defaults depend on the backend when unset
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Appended to every system prompt as additional instructions
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_llm_backend(),
            model: Some(default_llm_model()),
            api_url: None,
            api_key: None,
            timeout_secs: default_llm_timeout_secs(),
            custom_prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_min_response_chars")]
    pub min_response_chars: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            min_response_chars: default_min_response_chars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_kind")]
    pub kind: String,
    /// Minimum popularity score a story needs to be fetched.
    /// Unset means 100 for alert reports and no floor for trends digests.
    #[serde(default)]
    pub min_points: Option<u64>,
    /// Result cap per fetch. Unset means 20 for alerts and 50 for trends.
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Only fetch items created within the last N hours
    #[serde(default)]
    pub window_hours: Option<u64>,
    #[serde(default)]
    pub api_url: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            min_points: None,
            max_results: None,
            window_hours: None,
            api_url: None,
        }
    }
}

impl SourceConfig {
    pub fn source_kind(&self) -> Result<SourceKind, ConfigError> {
        self.kind.parse()
    }

    pub fn min_points_for(&self, report_kind: ReportKind) -> u64 {
        self.min_points.unwrap_or(match report_kind {
            ReportKind::Alerts => ALERT_MIN_POINTS,
            ReportKind::Trends => 0,
        })
    }

    pub fn max_results_for(&self, report_kind: ReportKind) -> u32 {
        self.max_results.unwrap_or(match report_kind {
            ReportKind::Alerts => ALERT_MAX_RESULTS,
            ReportKind::Trends => TRENDS_MAX_RESULTS,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelConfig {
    // Scheduling
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    // Output
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    #[serde(default)]
    pub report_kind: ReportKind,
    #[serde(default = "default_trending_limit")]
    pub trending_limit: usize,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

fn default_llm_backend() -> String {
    "ollama".to_string()
}

fn default_llm_model() -> String {
    "llama3.2".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_secs() -> u64 {
    1
}

fn default_min_response_chars() -> usize {
    10
}

fn default_source_kind() -> String {
    "hackernews".to_string()
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_trending_limit() -> usize {
    10
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig::default()]
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            reports_dir: default_reports_dir(),
            report_kind: ReportKind::default(),
            trending_limit: default_trending_limit(),
            llm: LlmConfig::default(),
            retry: RetryConfig::default(),
            sources: default_sources(),
        }
    }
}

impl SentinelConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Candidate config locations, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::get_base_dir().join(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sentinel").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Load config from an explicit path, or the first readable search path,
    /// falling back to defaults. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::search_paths()
                .into_iter()
                .find(|path| path.is_file())
                .map(|path| Self::from_file(&path))
                .transpose()?
                .unwrap_or_else(|| {
                    tracing::warn!("No config file found, using defaults + env vars");
                    Self::default()
                }),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config = toml::from_str::<SentinelConfig>(&contents)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save config as pretty TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(backend) = lookup("SENTINEL_LLM_BACKEND") {
            self.llm.backend = backend;
        }

        if let Some(model) = lookup("SENTINEL_LLM_MODEL") {
            self.llm.model = Some(model);
        }

        if let Some(url) = lookup("SENTINEL_LLM_API_URL") {
            self.llm.api_url = Some(url);
        }

        // OPENAI_API_KEY only fills a missing key
        if let Some(key) = lookup("SENTINEL_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        } else if self.llm.api_key.is_none() {
            self.llm.api_key = lookup("OPENAI_API_KEY");
        }

        if let Some(interval) = lookup("SENTINEL_INTERVAL_SECS") {
            self.interval_secs = interval.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "SENTINEL_INTERVAL_SECS",
                reason: format!("'{}' is not a number of seconds", interval),
            })?;
        }

        if let Some(dir) = lookup("SENTINEL_REPORTS_DIR") {
            self.reports_dir = PathBuf::from(dir);
        }

        if let Some(kind) = lookup("SENTINEL_REPORT_KIND") {
            self.report_kind = kind.parse()?;
        }

        Ok(())
    }

    /// Restrict every source to items created within the last `hours`
    pub fn with_window_hours(mut self, hours: u64) -> Self {
        for source in &mut self.sources {
            source.window_hours = Some(hours);
        }
        self
    }
}
