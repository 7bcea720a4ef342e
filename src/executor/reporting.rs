use crate::agent::{AgentLink, AgentSession};
use crate::core::config::UNNAMED_TEST;
use crate::core::{CommandResponse, CommandTransport, DriverCommand, SdkConfig};
use crate::errors::Result;
use crate::executor::redaction;
use crate::executor::step::{
    read_context, SharedContext, StepContext, StepExecutionHelper, StepPhase, StepScope, StepSettings,
};
use crate::reports::{CommandReport, CustomTestReport, StepReport};
use crate::utils::ScreenshotManager;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error};

/// Reporting switches shared by the executor and the reporter facade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportingFlags {
    pub disable_reports: bool,
    pub disable_auto_test_reports: bool,
    pub disable_command_reports: bool,
    pub disable_redaction: bool,
}

impl ReportingFlags {
    fn commands_enabled(&self) -> bool {
        !self.disable_reports && !self.disable_command_reports
    }
}

#[derive(Debug)]
struct ExecutorState {
    flags: ReportingFlags,
    stashed: Option<CommandReport>,
    latest_test_name: String,
    current_test_name: String,
    excluded_test_names: Vec<String>,
}

/// Runs driver commands and turns them into reports.
pub struct ReportingCommandExecutor {
    link: Arc<dyn AgentLink>,
    transport: Arc<dyn CommandTransport>,
    helper: StepExecutionHelper,
    context: SharedContext,
    state: Mutex<ExecutorState>,
}

impl ReportingCommandExecutor {
    pub fn new(link: Arc<dyn AgentLink>, transport: Arc<dyn CommandTransport>, config: &SdkConfig) -> Self {
        let session = link.session();
        let helper = StepExecutionHelper::new(Arc::clone(&transport), session.dialect, session.session_id.clone());
        let test_name = config.initial_test_name();

        let flags = ReportingFlags {
            disable_auto_test_reports: config.disable_auto_reporting,
            disable_command_reports: config.disable_auto_reporting,
            ..Default::default()
        };

        Self {
            link,
            transport,
            helper,
            context: Arc::new(Mutex::new(StepContext::default())),
            state: Mutex::new(ExecutorState {
                flags,
                stashed: None,
                latest_test_name: test_name.clone(),
                current_test_name: test_name,
                excluded_test_names: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ExecutorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> &AgentSession {
        self.link.session()
    }

    pub fn link(&self) -> &Arc<dyn AgentLink> {
        &self.link
    }

    pub fn helper(&self) -> &StepExecutionHelper {
        &self.helper
    }

    /// Executes and reports a command.
    pub async fn execute(&self, command: &DriverCommand, params: &Value) -> Result<CommandResponse> {
        self.update_known_test_name();
        let settings = self.settings();

        self.helper.apply_timeout(settings.timeout_ms).await?;
        self.helper
            .apply_sleep(settings.sleep_timing, settings.sleep_time_ms, StepPhase::Before, Some(command))
            .await;

        let outcome = self.transport.execute(command, params).await;

        self.helper
            .apply_sleep(settings.sleep_timing, settings.sleep_time_ms, StepPhase::After, Some(command))
            .await;

        let (result, passed) = match &outcome {
            Ok(response) => (response.value.clone(), response.is_passed()),
            Err(e) => (Value::String(e.to_string()), false),
        };
        self.report_command(command, params, result, passed, &settings).await;

        outcome
    }

    /// Executes a command without timing, test tracking or reporting.
    pub async fn execute_internal(&self, command: &DriverCommand, params: &Value) -> Result<CommandResponse> {
        self.transport.execute(command, params).await
    }

    async fn report_command(
        &self,
        command: &DriverCommand,
        params: &Value,
        result: Value,
        passed: bool,
        settings: &StepSettings,
    ) {
        if command.is_quit() {
            self.clear_stash();
            if !self.flags().disable_auto_test_reports {
                self.report_test();
            }
            return;
        }

        let (passed, message) =
            StepExecutionHelper::resolve_result(passed, settings.invert_result, settings.always_pass);

        let flags = self.flags();
        if !flags.commands_enabled() {
            debug!("Command [{}] - [{}]", command, outcome(passed));
            return;
        }

        let params = if flags.disable_redaction {
            params.clone()
        } else {
            redaction::redact_command(self, command, params).await
        };

        let screenshot = if StepExecutionHelper::should_screenshot(settings.screenshot_condition, passed) {
            self.create_screenshot().await
        } else {
            None
        };

        let report = CommandReport::new(command.clone(), params, result, passed)
            .with_message(message)
            .with_screenshot(screenshot);

        if self.is_polling() {
            self.state().stashed = Some(report);
            return;
        }

        let stashed = self.state().stashed.take();
        if let Some(stashed) = stashed {
            self.link.report_command(stashed);
        }
        self.link.report_command(report);
    }

    /// Sends a step report, flushing a stashed command first.
    pub fn submit_step(&self, report: StepReport) {
        self.clear_stash();
        self.link.report_step(report);
    }

    /// Reports the stashed command, if any.
    pub fn clear_stash(&self) {
        let mut state = self.state();
        let stashed = state.stashed.take();
        if let Some(stashed) = stashed {
            if state.flags.commands_enabled() {
                drop(state);
                self.link.report_command(stashed);
            }
        }
    }

    /// Sleeps for `ms` and reports it as a step.
    pub async fn pause(&self, ms: u64) {
        self.update_known_test_name();
        let settings = self.settings();

        self.helper
            .apply_sleep(settings.sleep_timing, settings.sleep_time_ms, StepPhase::Before, None)
            .await;
        tokio::time::sleep(Duration::from_millis(ms)).await;
        self.helper
            .apply_sleep(settings.sleep_timing, settings.sleep_time_ms, StepPhase::After, None)
            .await;

        let (passed, message) = StepExecutionHelper::resolve_result(true, settings.invert_result, settings.always_pass);
        let description = format!("Pause for {}ms", ms);

        if self.flags().disable_reports {
            debug!("Step [{}] - [{}]", description, outcome(passed));
            return;
        }

        let screenshot = if StepExecutionHelper::should_screenshot(settings.screenshot_condition, passed) {
            self.create_screenshot().await
        } else {
            None
        };
        self.submit_step(StepReport::new(description, message, passed).with_screenshot(screenshot));
    }

    /// Captures the current screen through an internal command.
    pub async fn create_screenshot(&self) -> Option<String> {
        let params = json!({ "sessionId": self.session().session_id });
        match self.execute_internal(&DriverCommand::Screenshot, &params).await {
            Ok(response) => {
                let screenshot = ScreenshotManager::from_response_value(&response.value);
                if screenshot.is_none() {
                    error!("Driver returned no screenshot data: {}", response.value);
                }
                screenshot
            }
            Err(e) => {
                error!("Error occurred creating a screenshot: {}", e);
                None
            }
        }
    }

    /// Reports the previous test when the current test name changed.
    pub fn update_known_test_name(&self) {
        let (changed, auto_reports) = {
            let state = self.state();
            (
                state.current_test_name != state.latest_test_name && state.current_test_name != UNNAMED_TEST,
                !state.flags.disable_auto_test_reports,
            )
        };
        if !changed {
            return;
        }

        if auto_reports {
            self.report_test();
        }
        let mut state = self.state();
        state.latest_test_name = state.current_test_name.clone();
    }

    /// Reports the latest known test as passed, unless unnamed or excluded.
    pub fn report_test(&self) {
        let report = {
            let state = self.state();
            let name = &state.latest_test_name;
            if name == UNNAMED_TEST {
                return;
            }
            if state.flags.disable_reports {
                debug!("Test [{}] - [Passed]", name);
                return;
            }
            if state.excluded_test_names.contains(name) {
                debug!("Test [{}] - Reporting skipped (marked as 'To be excluded')", name);
                return;
            }
            CustomTestReport::new(name.clone(), true, None)
        };
        self.link.report_test(report);
    }

    pub fn set_current_test_name(&self, name: impl Into<String>) {
        self.state().current_test_name = name.into();
    }

    pub fn latest_test_name(&self) -> String {
        self.state().latest_test_name.clone()
    }

    pub fn flags(&self) -> ReportingFlags {
        self.state().flags
    }

    pub fn set_disable_reports(&self, value: bool) {
        self.state().flags.disable_reports = value;
    }

    pub fn set_disable_auto_test_reports(&self, value: bool) {
        self.state().flags.disable_auto_test_reports = value;
    }

    pub fn set_disable_command_reports(&self, value: bool) {
        self.state().flags.disable_command_reports = value;
    }

    pub fn set_disable_redaction(&self, value: bool) {
        self.state().flags.disable_redaction = value;
    }

    pub fn set_excluded_test_names(&self, names: Vec<String>) {
        self.state().excluded_test_names = names;
    }

    pub fn settings(&self) -> StepSettings {
        read_context(&self.context).settings
    }

    pub fn is_polling(&self) -> bool {
        read_context(&self.context).polling
    }

    /// Applies `settings` until the returned scope is dropped.
    pub fn step_settings_scope(&self, settings: StepSettings) -> StepScope {
        StepScope::enter(&self.context, |previous| StepContext {
            settings: settings.inherit_from(&previous.settings),
            polling: previous.polling,
        })
    }

    /// Marks commands as part of a polling loop until the scope is dropped.
    pub fn polling_scope(&self) -> StepScope {
        StepScope::enter(&self.context, |previous| StepContext {
            settings: previous.settings.clone(),
            polling: true,
        })
    }
}

fn outcome(passed: bool) -> &'static str {
    if passed {
        "Passed"
    } else {
        "Failed"
    }
}
