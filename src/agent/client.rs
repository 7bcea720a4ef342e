use crate::actions::{
    ActionExecutionResponse, ActionProxy, AddonExecutionResponse, ExecutionResultType, ResultField,
};
use crate::agent::link::AgentLink;
use crate::agent::queue::{HttpReportSender, ReportQueue};
use crate::agent::session::{AgentSession, SessionRequest, SessionResponse};
use crate::agent::socket::LivenessSocket;
use crate::core::version::{
    AgentVersion, MIN_BATCH_REPORT_VERSION, MIN_LOCAL_REPORT_VERSION, MIN_SESSION_REUSE_VERSION,
};
use crate::core::SdkConfig;
use crate::errors::{Result, SdkError};
use crate::reports::{CommandReport, CustomTestReport, OperationResult, StepReport};
use crate::types::{ReportSettings, ReportType};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Agent HTTP endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    DevelopmentSession,
    ActionExecution,
    ReportCommand,
    ReportStep,
    ReportTest,
    ReportBatch,
    AddonExecution,
    Status,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::DevelopmentSession => "/api/development/session",
            Endpoint::ActionExecution => "/api/codeblocks/executions/",
            Endpoint::ReportCommand => "/api/development/report/command",
            Endpoint::ReportStep => "/api/development/report/step",
            Endpoint::ReportTest => "/api/development/report/test",
            Endpoint::ReportBatch => "/api/development/report/batch",
            Endpoint::AddonExecution => "/api/addons/executions",
            Endpoint::Status => "/api/status",
        }
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusResponse {
    pub tag: String,
}

impl AgentStatusResponse {
    pub fn version(&self) -> Result<AgentVersion> {
        self.tag.parse()
    }
}

/// A development session with the Agent plus its report queue.
pub struct AgentClient {
    config: SdkConfig,
    base_url: Url,
    token: Option<String>,
    http: reqwest::Client,
    session: AgentSession,
    report_settings: ReportSettings,
    version: AgentVersion,
    local_report: Option<String>,
    socket: Arc<LivenessSocket>,
    queue: RwLock<Arc<ReportQueue>>,
}

impl AgentClient {
    /// Starts a new development session.
    pub async fn start(
        config: SdkConfig,
        token: Option<String>,
        capabilities: Map<String, Value>,
        report_settings: ReportSettings,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.agent_url)?;
        let http = reqwest::Client::new();

        info!("Initializing new session with the Agent at {}", base_url);
        let request = SessionRequest::new(&config, capabilities, &report_settings);
        let body = serde_json::to_value(&request)?;

        let result = send(
            &http,
            Method::POST,
            base_url.join(Endpoint::DevelopmentSession.path())?,
            token.as_deref(),
            Some(&body),
            &[],
        )
        .await
        .map_err(|e| {
            if e.is_connection_failure() {
                error!("Could not reach the Agent. Please make sure that it is running and try again");
                SdkError::AgentConnect(format!(
                    "Connection error trying to connect to Agent on {}",
                    base_url
                ))
            } else {
                e
            }
        })?;

        if !result.passed {
            return Err(session_start_error(&result, &config));
        }

        let data = result.data.ok_or_else(|| {
            SdkError::Sdk("Could not parse session response: no JSON response body present".to_string())
        })?;
        let response: SessionResponse = serde_json::from_value(data)
            .map_err(|e| SdkError::Sdk(format!("Could not parse session response: {}", e)))?;

        for warning in response.warnings.iter().flatten() {
            warn!("Agent warning: {}", warning);
        }

        let version = match response.version.as_deref().map(str::parse::<AgentVersion>) {
            Some(Ok(version)) => version,
            Some(Err(e)) => {
                warn!("{}", e);
                AgentVersion::unknown()
            }
            None => {
                warn!("Agent did not report its version");
                AgentVersion::unknown()
            }
        };
        info!("Agent version: {}", version);

        if report_settings.report_type == ReportType::Local && !version.at_least(MIN_LOCAL_REPORT_VERSION) {
            error!(
                "Local reports are not supported by Agent version {}, upgrade to {} or newer",
                version, MIN_LOCAL_REPORT_VERSION
            );
            return Err(SdkError::ObsoleteVersion(format!(
                "Target Agent version [{}] doesn't support local reports. \
                 Upgrade the Agent to the latest version and try again.",
                version
            )));
        }

        if let Some(url) = &response.local_report_url {
            info!("Execution report will be available at {}", rewrite_report_url(url, &base_url));
        }

        let host = base_url
            .host_str()
            .ok_or_else(|| SdkError::Sdk(format!("Agent URL {} has no host", base_url)))?;
        let socket = LivenessSocket::open(
            host,
            response.dev_socket_port,
            response.uuid.as_deref(),
            Duration::from_millis(config.socket_handshake_timeout_ms),
        )
        .await?;

        let session = response.to_session();
        let queue = build_queue(&config, &base_url, token.clone(), &version, http.clone())?;
        info!(session_id = %session.session_id, dialect = ?session.dialect, "Session initialized");

        Ok(Self {
            config,
            base_url,
            token,
            http,
            session,
            report_settings,
            version,
            local_report: response.local_report,
            socket: Arc::new(socket),
            queue: RwLock::new(Arc::new(queue)),
        })
    }

    /// Continues the session with a fresh report queue. Handles to this client
    /// held elsewhere keep reporting into the new queue.
    pub fn restart_queue(&self) -> Result<()> {
        info!(session_id = %self.session.session_id, "Reusing existing Agent session");
        let queue = build_queue(
            &self.config,
            &self.base_url,
            self.token.clone(),
            &self.version,
            self.http.clone(),
        )?;
        *self.queue.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(queue);
        Ok(())
    }

    fn current_queue(&self) -> Arc<ReportQueue> {
        Arc::clone(&self.queue.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Flushes queued reports and releases the session.
    pub async fn stop(&self) {
        self.current_queue().stop().await;

        if let Some(path) = &self.local_report {
            info!("Execution report: {}", path);
        }

        if !self.can_reuse_session() {
            self.close_socket().await;
        }
    }

    pub async fn close_socket(&self) {
        self.socket.close().await;
    }

    pub fn can_reuse_session(&self) -> bool {
        self.version.at_least(MIN_SESSION_REUSE_VERSION)
    }

    pub fn version(&self) -> &AgentVersion {
        &self.version
    }

    pub fn report_settings(&self) -> &ReportSettings {
        &self.report_settings
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn pending_reports(&self) -> usize {
        self.current_queue().pending()
    }

    pub async fn is_socket_open(&self) -> bool {
        self.socket.is_open().await
    }

    /// Single HTTP exchange with the Agent; HTTP error statuses are returned
    /// in the result, only transport failures are errors.
    pub async fn send_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        params: &[(&str, &str)],
    ) -> Result<OperationResult> {
        if ![Method::GET, Method::POST, Method::PUT, Method::DELETE].contains(&method) {
            return Err(SdkError::Sdk(format!("Unsupported HTTP method {}", method)));
        }
        let url = self.base_url.join(path)?;
        send(&self.http, method, url, self.token.as_deref(), body, params).await
    }

    /// Runs an addon action; the Agent skips reporting it.
    pub async fn execute_proxy(&self, action: &ActionProxy) -> Result<AddonExecutionResponse> {
        let payload = action.to_payload();
        let result = self
            .send_request(
                Method::POST,
                Endpoint::AddonExecution.path(),
                Some(&payload),
                &[("skipReporting", "true")],
            )
            .await?;

        if result.status_code == StatusCode::NOT_FOUND.as_u16() {
            error!(
                "Action [{}] in addon [{}] is not installed in your account",
                action.class_name, action.guid
            );
            return Err(SdkError::AddonNotInstalled {
                guid: action.guid.clone(),
                class_name: action.class_name.clone(),
            });
        }

        if !result.passed {
            return Ok(AddonExecutionResponse {
                result: ExecutionResultType::Failed,
                message: result.message,
                fields: Vec::new(),
            });
        }

        let data = result.data.unwrap_or(Value::Null);
        let fields = match data.get("fields") {
            Some(Value::Array(_)) => serde_json::from_value::<Vec<ResultField>>(data["fields"].clone())?,
            _ => Vec::new(),
        };

        Ok(AddonExecutionResponse {
            result: ExecutionResultType::from_agent(data.get("resultType").and_then(Value::as_str)),
            message: data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            fields,
        })
    }

    /// Runs a codeblock stored in the account.
    pub async fn execute_action(&self, guid: &str, body: &Value) -> Result<ActionExecutionResponse> {
        let path = format!("{}{}", Endpoint::ActionExecution.path(), guid);
        let result = self.send_request(Method::POST, &path, Some(body), &[]).await?;

        if !result.passed {
            return Ok(ActionExecutionResponse {
                result: ExecutionResultType::Failed,
                message: result.message,
                outputs: None,
            });
        }

        let data = result.data.unwrap_or(Value::Null);
        Ok(ActionExecutionResponse {
            result: ExecutionResultType::from_agent(data.get("resultType").and_then(Value::as_str)),
            message: result.message,
            outputs: data.get("outputs").and_then(Value::as_object).cloned(),
        })
    }

    /// Renames the job of the running session. Best effort.
    pub async fn update_job_name(&self, job_name: &str) {
        if !self.config.update_job_name {
            debug!("Job name updates are disabled, keeping the current job name");
            return;
        }

        let body = json!({ "jobName": job_name });
        match self
            .send_request(Method::PUT, Endpoint::DevelopmentSession.path(), Some(&body), &[])
            .await
        {
            Ok(result) if result.passed => info!("Job name updated to '{}'", job_name),
            Ok(result) => error!(
                "Failed to update job name to '{}': {}",
                job_name, result.message
            ),
            Err(e) => error!("Failed to update job name to '{}': {}", job_name, e),
        }
    }

    /// Queries the Agent status without a session.
    pub async fn get_agent_version(config: &SdkConfig, token: Option<&str>) -> Result<AgentStatusResponse> {
        let url = Url::parse(&config.agent_url)?.join(Endpoint::Status.path())?;
        let mut request = reqwest::Client::new().get(url);
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::AgentConnect(format!(
                "Agent returned HTTP {} when trying to retrieve Agent status",
                status.as_u16()
            )));
        }

        let body: Value = serde_json::from_str(&response.text().await?).map_err(|_| {
            SdkError::Sdk("Could not parse Agent status response: no JSON response body present".to_string())
        })?;

        match body.get("tag").and_then(Value::as_str) {
            Some(tag) => Ok(AgentStatusResponse { tag: tag.to_string() }),
            None => Err(SdkError::Sdk(
                "Could not parse Agent status response: element 'tag' not found in JSON response body"
                    .to_string(),
            )),
        }
    }

    pub fn report_command(&self, report: CommandReport) {
        self.enqueue(&report, Endpoint::ReportCommand);
    }

    pub fn report_step(&self, report: StepReport) {
        self.enqueue(&report, Endpoint::ReportStep);
    }

    pub fn report_test(&self, report: CustomTestReport) {
        self.enqueue(&report, Endpoint::ReportTest);
    }

    fn enqueue<T: Serialize>(&self, report: &T, endpoint: Endpoint) {
        let payload = match serde_json::to_value(report) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize report for {}: {}", endpoint.path(), e);
                return;
            }
        };
        match self.base_url.join(endpoint.path()) {
            Ok(url) => self.current_queue().submit(payload, url),
            Err(e) => error!("Invalid report URL for {}: {}", endpoint.path(), e),
        }
    }
}

#[async_trait]
impl AgentLink for AgentClient {
    fn session(&self) -> &AgentSession {
        &self.session
    }

    fn report_command(&self, report: CommandReport) {
        AgentClient::report_command(self, report)
    }

    fn report_step(&self, report: StepReport) {
        AgentClient::report_step(self, report)
    }

    fn report_test(&self, report: CustomTestReport) {
        AgentClient::report_test(self, report)
    }

    async fn execute_proxy(&self, action: &ActionProxy) -> Result<AddonExecutionResponse> {
        AgentClient::execute_proxy(self, action).await
    }

    async fn execute_action(&self, guid: &str, body: &Value) -> Result<ActionExecutionResponse> {
        AgentClient::execute_action(self, guid, body).await
    }
}

fn build_queue(
    config: &SdkConfig,
    base_url: &Url,
    token: Option<String>,
    version: &AgentVersion,
    http: reqwest::Client,
) -> Result<ReportQueue> {
    let sender = Arc::new(HttpReportSender::new(http));
    let timeout = Duration::from_millis(config.reports_queue_timeout_ms);

    if version.at_least(MIN_BATCH_REPORT_VERSION) {
        debug!("Agent supports batch reports, batch size {}", config.max_batch_size);
        Ok(ReportQueue::start_batch(
            sender,
            token,
            base_url.join(Endpoint::ReportBatch.path())?,
            config.max_batch_size,
            timeout,
        ))
    } else {
        Ok(ReportQueue::start(sender, token, timeout))
    }
}

async fn send(
    http: &reqwest::Client,
    method: Method,
    url: Url,
    token: Option<&str>,
    body: Option<&Value>,
    params: &[(&str, &str)],
) -> Result<OperationResult> {
    let mut request = http.request(method, url);
    if let Some(token) = token {
        request = request.header(reqwest::header::AUTHORIZATION, token);
    }
    if !params.is_empty() {
        request = request.query(params);
    }
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    let data = serde_json::from_str::<Value>(&text).ok();

    if status.is_success() {
        return Ok(OperationResult {
            passed: true,
            status_code: status.as_u16(),
            message: String::new(),
            data,
        });
    }

    let message = data
        .as_ref()
        .and_then(|d| d.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());

    Ok(OperationResult {
        passed: false,
        status_code: status.as_u16(),
        message,
        data,
    })
}

fn session_start_error(result: &OperationResult, config: &SdkConfig) -> SdkError {
    match StatusCode::from_u16(result.status_code) {
        Ok(StatusCode::UNAUTHORIZED) => {
            error!("Failed to initialize a session with the Agent - invalid developer token supplied");
            error!(
                "Get your developer token from the Agent's SDK integration page \
                 and set it in the TP_DEV_TOKEN environment variable"
            );
            SdkError::InvalidToken(result.message.clone())
        }
        Ok(StatusCode::NOT_FOUND) => {
            let message = result
                .field("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Failed to start a new session!");
            SdkError::SessionStart(message.to_string())
        }
        Ok(StatusCode::NOT_ACCEPTABLE) => {
            error!(
                "Failed to initialize a session with the Agent - obsolete SDK version {}",
                config.sdk_version
            );
            SdkError::ObsoleteVersion(result.message.clone())
        }
        _ => {
            error!("Failed to initialize a session with the Agent");
            SdkError::AgentConnect(format!(
                "Agent responded with HTTP status {}: [{}]",
                result.status_code, result.message
            ))
        }
    }
}

/// Points a report URL returned by the Agent at the host the client talks to.
fn rewrite_report_url(raw: &str, agent: &Url) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if let Some(host) = agent.host_str() {
                let _ = url.set_host(Some(host));
            }
            url.to_string()
        }
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agent::socket::tests::spawn_dev_socket;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn test_config(server: &MockServer) -> SdkConfig {
        SdkConfig::default()
            .with_agent_url(server.uri())
            .with_token("dev-token")
    }

    pub(crate) async fn mount_session(server: &MockServer, version: &str) {
        let port = spawn_dev_socket(None).await;
        Mock::given(method("POST"))
            .and(path("/api/development/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "devSocketPort": port,
                "sessionId": "abc",
                "dialect": "W3C",
                "capabilities": {},
                "version": version,
            })))
            .mount(server)
            .await;
    }

    async fn start(server: &MockServer, settings: ReportSettings) -> Result<AgentClient> {
        AgentClient::start(
            test_config(server),
            Some("dev-token".to_string()),
            Map::new(),
            settings,
        )
        .await
    }

    async fn start_with_status(status: u16, body: Value) -> SdkError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/development/session"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        match start(&server, ReportSettings::default()).await {
            Err(e) => e,
            Ok(_) => panic!("session start should fail with HTTP {}", status),
        }
    }

    #[tokio::test]
    async fn test_session_start_error_mapping() {
        assert!(matches!(
            start_with_status(401, json!({"message": "bad token"})).await,
            SdkError::InvalidToken(m) if m == "bad token"
        ));
        assert!(matches!(
            start_with_status(404, json!({})).await,
            SdkError::SessionStart(m) if m == "Failed to start a new session!"
        ));
        assert!(matches!(
            start_with_status(404, json!({"message": "no device"})).await,
            SdkError::SessionStart(m) if m == "no device"
        ));
        assert!(matches!(
            start_with_status(406, json!({"message": "upgrade"})).await,
            SdkError::ObsoleteVersion(_)
        ));
        assert!(matches!(
            start_with_status(500, json!({"message": "boom"})).await,
            SdkError::AgentConnect(m) if m == "Agent responded with HTTP status 500: [boom]"
        ));
    }

    #[tokio::test]
    async fn test_session_start_without_agent() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{}", port);
        let config = SdkConfig::default().with_agent_url(url.clone());
        let result = AgentClient::start(config, None, Map::new(), ReportSettings::default()).await;
        match result {
            Err(SdkError::AgentConnect(message)) => {
                assert!(message.starts_with("Connection error trying to connect to Agent on"));
            }
            _ => panic!("expected a connection error"),
        }
    }

    #[tokio::test]
    async fn test_session_request_carries_settings_and_token() {
        let server = MockServer::start().await;
        let port = spawn_dev_socket(None).await;
        Mock::given(method("POST"))
            .and(path("/api/development/session"))
            .and(header("Authorization", "dev-token"))
            .and(body_partial_json(json!({
                "projectName": "project",
                "jobName": "job",
                "language": "Rust",
                "reportType": "CLOUD_AND_LOCAL",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "devSocketPort": port,
                "warnings": ["Agent is running in offline mode"],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = start(&server, ReportSettings::new("project", "job")).await.unwrap();
        assert!(uuid::Uuid::parse_str(&client.session.session_id).is_ok());
        assert!(!client.can_reuse_session());
        client.stop().await;
        assert!(!client.is_socket_open().await);
    }

    #[tokio::test]
    async fn test_local_report_requires_recent_agent() {
        let server = MockServer::start().await;
        mount_session(&server, "2.0.9").await;
        let result = start(
            &server,
            ReportSettings::new("p", "j").with_report_type(ReportType::Local),
        )
        .await;
        assert!(matches!(result, Err(SdkError::ObsoleteVersion(_))));
    }

    #[tokio::test]
    async fn test_local_session_reports_step() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("POST"))
            .and(path("/api/development/report/step"))
            .and(body_partial_json(json!({"passed": false, "screenshot": "c2NyZWVu"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = start(
            &server,
            ReportSettings::new("p", "j").with_report_type(ReportType::Local),
        )
        .await
        .unwrap();
        assert_eq!(client.session.session_id, "abc");
        assert!(client.session.dialect.is_w3c());
        assert!(client.can_reuse_session());

        client.report_step(
            StepReport::new("Check title", "Step Failed", false).with_screenshot(Some("c2NyZWVu".to_string())),
        );
        client.stop().await;
        assert_eq!(client.pending_reports(), 0);
        assert!(client.is_socket_open().await);
        client.close_socket().await;
    }

    #[tokio::test]
    async fn test_recent_agent_gets_batched_reports() {
        let server = MockServer::start().await;
        mount_session(&server, "3.1.0").await;
        Mock::given(method("POST"))
            .and(path("/api/development/report/batch"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/development/report/command"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = start(&server, ReportSettings::default()).await.unwrap();
        for i in 0..3 {
            client.report_command(CommandReport::new(
                crate::core::DriverCommand::Other(format!("cmd{}", i)),
                json!({}),
                Value::Null,
                true,
            ));
        }
        client.stop().await;

        let requests = server.received_requests().await.unwrap();
        let reported: Vec<Value> = requests
            .iter()
            .filter(|r| r.url.path() == "/api/development/report/batch")
            .flat_map(|r| r.body_json::<Vec<Value>>().unwrap())
            .collect();
        let names: Vec<&str> = reported
            .iter()
            .map(|r| r["commandName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["cmd0", "cmd1", "cmd2"]);
        client.close_socket().await;
    }

    #[tokio::test]
    async fn test_get_agent_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tag": "3.2.1"})))
            .mount(&server)
            .await;

        let status = AgentClient::get_agent_version(&test_config(&server), Some("dev-token"))
            .await
            .unwrap();
        assert_eq!(status.tag, "3.2.1");
        assert!(status.version().unwrap().at_least(MIN_BATCH_REPORT_VERSION));
    }

    #[tokio::test]
    async fn test_get_agent_version_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let err = AgentClient::get_agent_version(&test_config(&server), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Agent connection failed: Agent returned HTTP 503 when trying to retrieve Agent status"
        );

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "1"})))
            .mount(&server)
            .await;
        let err = AgentClient::get_agent_version(&test_config(&server), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not parse Agent status response: element 'tag' not found in JSON response body"
        );

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let err = AgentClient::get_agent_version(&test_config(&server), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not parse Agent status response: no JSON response body present"
        );
    }

    #[tokio::test]
    async fn test_execute_proxy() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("POST"))
            .and(path("/api/addons/executions"))
            .and(query_param("skipReporting", "true"))
            .and(body_partial_json(json!({"guid": "addon", "className": "TypePhone"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resultType": "Passed",
                "message": "done",
                "fields": [
                    {"name": "phone", "value": "555-0100", "output": true},
                    {"name": "prefix", "value": "+1", "output": false},
                ],
            })))
            .mount(&server)
            .await;

        let client = start(&server, ReportSettings::default()).await.unwrap();
        let response = client
            .execute_proxy(&ActionProxy::new("addon", "TypePhone").with_parameter("prefix", "+1"))
            .await
            .unwrap();
        assert!(response.result.is_passed());
        assert_eq!(response.message, "done");
        assert_eq!(response.fields.len(), 2);
        assert!(response.fields[0].output);
        client.stop().await;
        client.close_socket().await;
    }

    #[tokio::test]
    async fn test_execute_proxy_not_installed() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("POST"))
            .and(path("/api/addons/executions"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = start(&server, ReportSettings::default()).await.unwrap();
        let result = client.execute_proxy(&ActionProxy::new("addon", "Missing")).await;
        assert!(matches!(
            result,
            Err(SdkError::AddonNotInstalled { ref class_name, .. }) if class_name == "Missing"
        ));
        client.stop().await;
        client.close_socket().await;
    }

    #[tokio::test]
    async fn test_execute_action() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("POST"))
            .and(path("/api/codeblocks/executions/block-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resultType": "Passed",
                "outputs": {"text": "hello"},
            })))
            .mount(&server)
            .await;

        let client = start(&server, ReportSettings::default()).await.unwrap();
        let response = client.execute_action("block-1", &json!({})).await.unwrap();
        assert!(response.result.is_passed());
        assert_eq!(response.outputs.unwrap()["text"], "hello");
        client.stop().await;
        client.close_socket().await;
    }

    #[tokio::test]
    async fn test_send_request() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("DELETE"))
            .and(path("/api/things"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "busy"})))
            .mount(&server)
            .await;

        let client = start(&server, ReportSettings::default()).await.unwrap();
        let result = client
            .send_request(Method::DELETE, "/api/things", None, &[])
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.status_code, 409);
        assert_eq!(result.message, "busy");

        let unsupported = client.send_request(Method::PATCH, "/api/things", None, &[]).await;
        assert!(matches!(unsupported, Err(SdkError::Sdk(m)) if m.starts_with("Unsupported HTTP method")));
        client.stop().await;
        client.close_socket().await;
    }

    #[tokio::test]
    async fn test_update_job_name() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("PUT"))
            .and(path("/api/development/session"))
            .and(body_partial_json(json!({"jobName": "nightly"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = test_config(&server);
        config.update_job_name = true;
        let client = AgentClient::start(config, Some("dev-token".to_string()), Map::new(), ReportSettings::default())
            .await
            .unwrap();
        client.update_job_name("nightly").await;
        client.stop().await;

        let disabled = start(&server, ReportSettings::default()).await.unwrap();
        disabled.update_job_name("ignored").await;
        disabled.stop().await;
        disabled.close_socket().await;
    }

    #[test]
    fn test_rewrite_report_url() {
        let agent = Url::parse("http://10.0.0.5:8585").unwrap();
        assert_eq!(
            rewrite_report_url("http://localhost:8585/report/123", &agent),
            "http://10.0.0.5:8585/report/123"
        );
        assert_eq!(rewrite_report_url("not a url", &agent), "not a url");
    }
}
