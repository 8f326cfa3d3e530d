use pagegate_core::config::ObserverSettings;

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Observer API connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Base URL, without the `/api/v1` suffix.
    pub url: String,
    pub project_id: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    /// Maximum retries for transient failures.
    pub max_retries: u32,
}

impl ObserverConfig {
    pub fn new(url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            project_id: project_id.into(),
            token: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

impl From<&ObserverSettings> for ObserverConfig {
    fn from(s: &ObserverSettings) -> Self {
        Self {
            url: s.url.clone(),
            project_id: s.project_id.clone(),
            token: s.token.clone(),
            timeout_secs: s.timeout_secs,
            max_retries: s.max_retries,
        }
    }
}
