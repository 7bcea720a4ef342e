use crate::executor::{ReportingCommandExecutor, StepExecutionHelper};
use crate::reports::{CustomTestReport, StepReport};
use crate::types::ElementSearchCriteria;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// A step reported explicitly by test code.
#[derive(Debug, Clone, Default)]
pub struct ManualStep {
    pub description: String,
    pub message: String,
    pub passed: bool,
    pub screenshot: bool,
    pub element: Option<ElementSearchCriteria>,
    pub inputs: Option<Map<String, Value>>,
    pub outputs: Option<Map<String, Value>>,
}

impl ManualStep {
    pub fn new(description: impl Into<String>, message: impl Into<String>, passed: bool) -> Self {
        Self {
            description: description.into(),
            message: message.into(),
            passed,
            ..Default::default()
        }
    }

    pub fn with_screenshot(mut self) -> Self {
        self.screenshot = true;
        self
    }

    pub fn with_element(mut self, element: ElementSearchCriteria) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: Map<String, Value>) -> Self {
        self.outputs = Some(outputs);
        self
    }
}

/// Test framework hooks feed the report through this sink.
#[async_trait]
pub trait ReportingEvents: Send + Sync {
    fn on_test_started(&self, name: &str);

    async fn on_step_finished(&self, description: &str, passed: bool, message: Option<&str>);

    async fn on_scenario_finished(&self, name: &str, passed: bool, message: Option<String>);
}

/// Manual reporting and report toggles for test code.
#[derive(Clone)]
pub struct Reporter {
    executor: Arc<ReportingCommandExecutor>,
}

impl Reporter {
    pub fn new(executor: Arc<ReportingCommandExecutor>) -> Self {
        Self { executor }
    }

    pub async fn step(&self, description: &str, message: &str, passed: bool) {
        self.step_with(ManualStep::new(description, message, passed)).await
    }

    pub async fn step_with(&self, step: ManualStep) {
        self.executor.update_known_test_name();

        if self.executor.flags().disable_reports {
            debug!(
                "Step [{}] - [{}]",
                step.description,
                if step.passed { "Passed" } else { "Failed" }
            );
            return;
        }

        let condition = self.executor.settings().screenshot_condition;
        let screenshot = if step.screenshot || StepExecutionHelper::should_screenshot(condition, step.passed) {
            self.executor.create_screenshot().await
        } else {
            None
        };

        let report = StepReport::new(step.description, step.message, step.passed)
            .with_screenshot(screenshot)
            .with_element(step.element)
            .with_inputs(step.inputs)
            .with_outputs(step.outputs);
        self.executor.submit_step(report);
    }

    /// Reports a test; the name defaults to the latest known test name.
    pub fn test(&self, name: Option<&str>, passed: bool, message: Option<String>) {
        self.executor.update_known_test_name();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| self.executor.latest_test_name());

        let flags = self.executor.flags();
        if flags.disable_reports {
            debug!("Test [{}] - [{}]", name, if passed { "Passed" } else { "Failed" });
            return;
        }
        if !flags.disable_auto_test_reports {
            warn!(
                "Automatic test reporting is enabled, reporting test [{}] manually may produce duplicates. \
                 Disable automatic test reports to avoid this",
                name
            );
        }

        self.executor.clear_stash();
        self.executor
            .link()
            .report_test(CustomTestReport::new(name, passed, message));
    }

    pub fn disable_reports(&self, disabled: bool) {
        self.executor.set_disable_reports(disabled);
    }

    pub fn disable_auto_test_reports(&self, disabled: bool) {
        self.executor.set_disable_auto_test_reports(disabled);
    }

    pub fn disable_command_reports(&self, disabled: bool) {
        self.executor.set_disable_command_reports(disabled);
    }

    pub fn disable_redaction(&self, disabled: bool) {
        self.executor.set_disable_redaction(disabled);
    }

    pub fn exclude_test_names<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.executor
            .set_excluded_test_names(names.into_iter().map(Into::into).collect());
    }
}

#[async_trait]
impl ReportingEvents for Reporter {
    fn on_test_started(&self, name: &str) {
        self.executor.set_current_test_name(name);
    }

    async fn on_step_finished(&self, description: &str, passed: bool, message: Option<&str>) {
        self.step(description, message.unwrap_or_default(), passed).await;
    }

    async fn on_scenario_finished(&self, name: &str, passed: bool, message: Option<String>) {
        self.test(Some(name), passed, message);
    }
}
