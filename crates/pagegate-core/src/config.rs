//! Run configuration: YAML file, then `PAGEGATE_*` overrides, then CLI flags.
//!
//! Built once at startup and passed down. Nothing below the CLI reads the
//! environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregation;
use crate::errors::ConfigError;
use crate::notify::Channel;
use crate::report::DEFAULT_QUALITY_GATE_PERCENT;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BUCKET: &str = "reports";
pub const DEFAULT_ENVIRONMENT: &str = "Default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub version: u32,
    pub test_name: String,
    pub environment: String,
    pub report_id: String,
    pub test_id: String,
    /// Highest tolerated share of failed thresholds, in percent.
    pub quality_gate_percent: f64,
    pub page_aggregation: Aggregation,
    pub page_timeout_secs: u64,
    pub bucket: String,
    pub notifications: Vec<Channel>,
    /// Engagement the issue payload is filed under.
    pub engagement: Option<String>,
    pub observer: Option<ObserverSettings>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            test_name: String::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            report_id: String::new(),
            test_id: String::new(),
            quality_gate_percent: DEFAULT_QUALITY_GATE_PERCENT,
            page_aggregation: Aggregation::default(),
            page_timeout_secs: DEFAULT_PAGE_TIMEOUT_SECS,
            bucket: DEFAULT_BUCKET.to_string(),
            notifications: Vec::new(),
            engagement: None,
            observer: None,
        }
    }
}

/// Where the observer API lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverSettings {
    pub url: String,
    pub project_id: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl RunConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// Apply `PAGEGATE_*` variables from the process environment.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PAGEGATE_TEST_NAME") {
            self.test_name = v;
        }
        if let Some(v) = get("PAGEGATE_ENVIRONMENT") {
            self.environment = v;
        }
        if let Some(v) = get("PAGEGATE_REPORT_ID") {
            self.report_id = v;
        }
        if let Some(v) = get("PAGEGATE_TEST_ID") {
            self.test_id = v;
        }
        if let Some(v) = get("PAGEGATE_QUALITY_GATE") {
            self.quality_gate_percent = v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("PAGEGATE_QUALITY_GATE is not a number: {v}"))
            })?;
        }
        if let Some(v) = get("PAGEGATE_PAGE_AGGREGATION") {
            self.page_aggregation = v
                .trim()
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("PAGEGATE_PAGE_AGGREGATION: {e}")))?;
        }
        if let Some(v) = get("PAGEGATE_PAGE_TIMEOUT_SECS") {
            self.page_timeout_secs = v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("PAGEGATE_PAGE_TIMEOUT_SECS is not a number: {v}"))
            })?;
        }
        if let Some(v) = get("PAGEGATE_BUCKET") {
            self.bucket = v;
        }
        if let Some(v) = get("PAGEGATE_NOTIFICATIONS") {
            self.notifications = parse_channels(&v)?;
        }
        if let Some(v) = get("PAGEGATE_ENGAGEMENT") {
            self.engagement = Some(v);
        }

        let url = get("PAGEGATE_OBSERVER_URL");
        let project = get("PAGEGATE_PROJECT_ID");
        let token = get("PAGEGATE_TOKEN");
        self.observer = match (self.observer.take(), url, project) {
            (Some(mut obs), url, project) => {
                if let Some(url) = url {
                    obs.url = url;
                }
                if let Some(project) = project {
                    obs.project_id = project;
                }
                Some(obs)
            }
            (None, Some(url), Some(project_id)) => Some(ObserverSettings {
                url,
                project_id,
                token: None,
                timeout_secs: default_timeout_secs(),
                max_retries: default_max_retries(),
            }),
            _ => None,
        };
        if let (Some(obs), Some(token)) = (self.observer.as_mut(), token) {
            obs.token = Some(token);
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.quality_gate_percent) {
            return Err(ConfigError::Invalid(format!(
                "quality_gate_percent must be within 0..=100, got {}",
                self.quality_gate_percent
            )));
        }
        if self.page_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "page_timeout_secs must be positive".into(),
            ));
        }
        if let Some(obs) = &self.observer {
            if obs.url.trim().is_empty() || obs.project_id.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "observer needs both url and project_id".into(),
                ));
            }
        }
        Ok(())
    }
}

/// `email;issue` or `email,issue`.
pub fn parse_channels(raw: &str) -> Result<Vec<Channel>, ConfigError> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "email" => Ok(Channel::Email),
            "issue" => Ok(Channel::Issue),
            other => Err(ConfigError::Invalid(format!(
                "unknown notification channel: {other}"
            ))),
        })
        .collect()
}

pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_config(&raw)
}

pub fn parse_config(raw: &str) -> Result<RunConfig, ConfigError> {
    let cfg: RunConfig =
        serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError::Version {
            found: cfg.version,
            supported: SUPPORTED_CONFIG_VERSION,
        });
    }
    cfg.validate()?;
    Ok(cfg)
}
