//! In-memory doubles for the driver, the Agent link and report delivery.

use crate::actions::{ActionExecutionResponse, ActionProxy, AddonExecutionResponse};
use crate::agent::{AgentLink, AgentSession, ReportSender};
use crate::core::{CommandResponse, CommandTransport, DriverCommand};
use crate::errors::{Result, SdkError};
use crate::reports::{CommandReport, CustomTestReport, StepReport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use url::Url;

/// Records every command and answers with canned responses.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<(DriverCommand, Value)>>,
    responses: HashMap<String, CommandResponse>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    pub fn with_response(mut self, command: &str, response: CommandResponse) -> Self {
        self.responses.insert(command.to_string(), response);
        self
    }

    /// Makes the transport return an error for `command`.
    pub fn failing_on(mut self, command: &str) -> Self {
        self.failing.insert(command.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(DriverCommand, Value)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().iter().map(|(c, _)| c.name().to_string()).collect()
    }
}

#[async_trait]
impl CommandTransport for RecordingTransport {
    async fn execute(&self, command: &DriverCommand, params: &Value) -> Result<CommandResponse> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push((command.clone(), params.clone()));
        if self.failing.contains(command.name()) {
            return Err(SdkError::Sdk(format!("{} failed", command)));
        }
        Ok(self
            .responses
            .get(command.name())
            .cloned()
            .unwrap_or_else(|| CommandResponse::ok(Value::Null)))
    }
}

#[derive(Default)]
struct Recorded {
    commands: Vec<CommandReport>,
    steps: Vec<StepReport>,
    tests: Vec<CustomTestReport>,
    events: Vec<&'static str>,
    actions: Vec<ActionProxy>,
    codeblocks: Vec<(String, Value)>,
}

/// Agent stand-in that keeps the reports it receives.
pub struct RecordingLink {
    session: AgentSession,
    recorded: Mutex<Recorded>,
    addon_response: AddonExecutionResponse,
    addon_installed: bool,
    action_response: ActionExecutionResponse,
}

impl RecordingLink {
    pub fn new(session: AgentSession) -> Self {
        Self {
            session,
            recorded: Mutex::new(Recorded::default()),
            addon_response: AddonExecutionResponse::default(),
            addon_installed: true,
            action_response: ActionExecutionResponse::default(),
        }
    }

    pub fn with_addon_response(mut self, response: AddonExecutionResponse) -> Self {
        self.addon_response = response;
        self
    }

    pub fn with_action_response(mut self, response: ActionExecutionResponse) -> Self {
        self.action_response = response;
        self
    }

    pub fn without_addons(mut self) -> Self {
        self.addon_installed = false;
        self
    }

    pub fn commands(&self) -> Vec<CommandReport> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).commands.clone()
    }

    pub fn steps(&self) -> Vec<StepReport> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).steps.clone()
    }

    pub fn tests(&self) -> Vec<CustomTestReport> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).tests.clone()
    }

    /// Kinds of reports in arrival order: "command", "step" or "test".
    pub fn events(&self) -> Vec<&'static str> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).events.clone()
    }

    pub fn actions(&self) -> Vec<ActionProxy> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).actions.clone()
    }

    /// Codeblock executions as `(guid, body)`.
    pub fn codeblocks(&self) -> Vec<(String, Value)> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).codeblocks.clone()
    }
}

#[async_trait]
impl AgentLink for RecordingLink {
    fn session(&self) -> &AgentSession {
        &self.session
    }

    fn report_command(&self, report: CommandReport) {
        let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
        recorded.commands.push(report);
        recorded.events.push("command");
    }

    fn report_step(&self, report: StepReport) {
        let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
        recorded.steps.push(report);
        recorded.events.push("step");
    }

    fn report_test(&self, report: CustomTestReport) {
        let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
        recorded.tests.push(report);
        recorded.events.push("test");
    }

    async fn execute_proxy(&self, action: &ActionProxy) -> Result<AddonExecutionResponse> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).actions.push(action.clone());
        if !self.addon_installed {
            return Err(SdkError::AddonNotInstalled {
                guid: action.guid.clone(),
                class_name: action.class_name.clone(),
            });
        }
        Ok(self.addon_response.clone())
    }

    async fn execute_action(&self, guid: &str, body: &Value) -> Result<ActionExecutionResponse> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .codeblocks
            .push((guid.to_string(), body.clone()));
        Ok(self.action_response.clone())
    }
}

/// Report sender that records deliveries, optionally failing every attempt.
#[derive(Default)]
pub struct RecordingSender {
    posts: Mutex<Vec<(String, Option<String>, Value)>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Delivered reports as `(path, token, body)`.
    pub fn posts(&self) -> Vec<(String, Option<String>, Value)> {
        self.posts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportSender for RecordingSender {
    async fn post(&self, url: &Url, token: Option<&str>, body: &Value) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SdkError::UnexpectedStatus {
                status: 500,
                body: "Agent unavailable".to_string(),
            });
        }
        self.posts.lock().unwrap_or_else(PoisonError::into_inner).push((
            url.path().to_string(),
            token.map(str::to_string),
            body.clone(),
        ));
        Ok(())
    }
}
