use crate::errors::{Result, SdkError};
use crate::types::ReportSettings;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_AGENT_URL: &str = "http://127.0.0.1:8585";
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;
pub const UNNAMED_TEST: &str = "Unnamed Test";

pub const ENV_AGENT_URL: &str = "TP_AGENT_URL";
pub const ENV_DEV_TOKEN: &str = "TP_DEV_TOKEN";
pub const ENV_DISABLE_AUTO_REPORTING: &str = "TP_DISABLE_AUTO_REPORTING";
pub const ENV_UPDATE_JOB_NAME: &str = "TP_UPDATE_JOB_NAME";
pub const ENV_MAX_BATCH_SIZE: &str = "TP_MAX_REPORTS_BATCH_SIZE";
pub const ENV_PROJECT_NAME: &str = "TP_PROJECT_NAME";
pub const ENV_JOB_NAME: &str = "TP_JOB_NAME";
pub const ENV_TEST_NAME: &str = "TP_TEST_NAME";

/// What to do when no developer token is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TokenPolicy {
    #[default]
    FailFast,
    AllowMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    pub agent_url: String,
    pub token: Option<String>,
    pub token_policy: TokenPolicy,
    pub disable_auto_reporting: bool,
    pub update_job_name: bool,
    pub max_batch_size: usize,
    pub project_name: Option<String>,
    pub job_name: Option<String>,
    pub test_name: Option<String>,
    pub reports_queue_timeout_ms: u64,
    pub socket_handshake_timeout_ms: u64,
    pub sdk_version: String,
    pub language: String,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            agent_url: DEFAULT_AGENT_URL.to_string(),
            token: None,
            token_policy: TokenPolicy::default(),
            disable_auto_reporting: false,
            update_job_name: false,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            project_name: None,
            job_name: None,
            test_name: None,
            reports_queue_timeout_ms: 10_000,
            socket_handshake_timeout_ms: 15_000,
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            language: "Rust".to_string(),
        }
    }
}

impl SdkConfig {
    /// Reads the process environment once.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        match lookup(ENV_AGENT_URL) {
            Some(address) => config.agent_url = address.replace("localhost", "127.0.0.1"),
            None => info!(
                "No Agent service address found in {} environment variable, defaulting to {}",
                ENV_AGENT_URL, DEFAULT_AGENT_URL
            ),
        }
        info!("Using {} as the Agent URL", config.agent_url);

        config.token = lookup(ENV_DEV_TOKEN).filter(|t| !t.trim().is_empty());
        config.disable_auto_reporting = lookup(ENV_DISABLE_AUTO_REPORTING)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        config.update_job_name = lookup(ENV_UPDATE_JOB_NAME)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);

        if let Some(raw) = lookup(ENV_MAX_BATCH_SIZE) {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => config.max_batch_size = size,
                _ => warn!(
                    "The environment variable {} value must be a positive integer, using {}",
                    ENV_MAX_BATCH_SIZE, DEFAULT_MAX_BATCH_SIZE
                ),
            }
        }
        info!("The maximum reports batch size is defined as {}", config.max_batch_size);

        config.project_name = lookup(ENV_PROJECT_NAME);
        config.job_name = lookup(ENV_JOB_NAME);
        config.test_name = lookup(ENV_TEST_NAME);
        config
    }

    pub fn with_agent_url(mut self, url: impl Into<String>) -> Self {
        self.agent_url = url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_token_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    /// Resolves the developer token according to the configured policy.
    pub fn developer_token(&self) -> Result<Option<String>> {
        match (&self.token, self.token_policy) {
            (Some(token), _) => Ok(Some(token.clone())),
            (None, TokenPolicy::AllowMissing) => Ok(None),
            (None, TokenPolicy::FailFast) => Err(SdkError::Sdk(format!(
                "No development token defined in {} environment variable",
                ENV_DEV_TOKEN
            ))),
        }
    }

    /// Report settings built from `TP_PROJECT_NAME` and `TP_JOB_NAME`.
    pub fn default_report_settings(&self) -> ReportSettings {
        ReportSettings {
            project_name: self.project_name.clone(),
            job_name: self.job_name.clone(),
            ..Default::default()
        }
    }

    pub fn initial_test_name(&self) -> String {
        self.test_name
            .clone()
            .unwrap_or_else(|| UNNAMED_TEST.to_string())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on" | "t"
    )
}
