use crate::core::SdkConfig;
use crate::types::{Dialect, ReportSettings, ReportType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The development session negotiated with the Agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSession {
    pub remote_address: Option<String>,
    pub session_id: String,
    pub dialect: Dialect,
    pub capabilities: Map<String, Value>,
}

impl AgentSession {
    pub fn new(session_id: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            remote_address: None,
            session_id: session_id.into(),
            dialect,
            capabilities: Map::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Map<String, Value>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn capability(&self, name: &str) -> Option<&str> {
        self.capabilities.get(name).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub project_name: Option<String>,
    pub job_name: Option<String>,
    pub capabilities: Map<String, Value>,
    pub sdk_version: String,
    pub language: String,
    pub report_type: ReportType,
    pub report_name: Option<String>,
    pub report_path: Option<String>,
}

impl SessionRequest {
    pub fn new(config: &SdkConfig, capabilities: Map<String, Value>, settings: &ReportSettings) -> Self {
        Self {
            project_name: settings.project_name.clone(),
            job_name: settings.job_name.clone(),
            capabilities,
            sdk_version: config.sdk_version.clone(),
            language: config.language.clone(),
            report_type: settings.report_type,
            report_name: settings.report_name.clone(),
            report_path: settings.report_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub dev_socket_port: u16,
    pub server_address: Option<String>,
    pub session_id: Option<String>,
    pub dialect: Option<String>,
    #[serde(default)]
    pub capabilities: Option<Map<String, Value>>,
    pub version: Option<String>,
    pub local_report: Option<String>,
    pub local_report_url: Option<String>,
    pub uuid: Option<String>,
    pub warnings: Option<Vec<String>>,
}

impl SessionResponse {
    pub fn to_session(&self) -> AgentSession {
        AgentSession {
            remote_address: self.server_address.clone(),
            session_id: self
                .session_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            dialect: Dialect::from_agent(self.dialect.as_deref()),
            capabilities: self.capabilities.clone().unwrap_or_default(),
        }
    }
}
