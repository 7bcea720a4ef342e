use crate::core::{CommandTransport, DriverCommand};
use crate::errors::Result;
use crate::types::Dialect;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SleepTiming {
    Before,
    After,
    Inherit,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScreenshotCondition {
    Always,
    Never,
    Success,
    #[default]
    Failure,
    Inherit,
}

/// Which side of the command a sleep applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Before,
    After,
}

/// How the next steps are timed, evaluated and screenshotted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSettings {
    pub sleep_time_ms: u64,
    pub sleep_timing: SleepTiming,
    /// Implicit wait to apply before each step; non-positive leaves it untouched.
    pub timeout_ms: i64,
    pub invert_result: bool,
    pub always_pass: bool,
    pub screenshot_condition: ScreenshotCondition,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            sleep_time_ms: 0,
            sleep_timing: SleepTiming::None,
            timeout_ms: -1,
            invert_result: false,
            always_pass: false,
            screenshot_condition: ScreenshotCondition::Failure,
        }
    }
}

impl StepSettings {
    pub fn with_sleep(mut self, timing: SleepTiming, sleep_time_ms: u64) -> Self {
        self.sleep_timing = timing;
        self.sleep_time_ms = sleep_time_ms;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_invert_result(mut self, invert: bool) -> Self {
        self.invert_result = invert;
        self
    }

    pub fn with_always_pass(mut self, always_pass: bool) -> Self {
        self.always_pass = always_pass;
        self
    }

    pub fn with_screenshot_condition(mut self, condition: ScreenshotCondition) -> Self {
        self.screenshot_condition = condition;
        self
    }

    /// Replaces `Inherit` values with the ones from `previous`.
    pub fn inherit_from(mut self, previous: &StepSettings) -> Self {
        if self.sleep_timing == SleepTiming::Inherit {
            self.sleep_timing = previous.sleep_timing;
        }
        if self.screenshot_condition == ScreenshotCondition::Inherit {
            self.screenshot_condition = previous.screenshot_condition;
        }
        self
    }
}

/// Settings in effect plus whether commands run inside a polling loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepContext {
    pub settings: StepSettings,
    pub polling: bool,
}

pub(crate) type SharedContext = Arc<Mutex<StepContext>>;

pub(crate) fn read_context(context: &SharedContext) -> StepContext {
    context.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Restores the previous step context when dropped.
#[must_use = "the previous step context is restored as soon as the scope is dropped"]
pub struct StepScope {
    context: SharedContext,
    previous: Option<StepContext>,
}

impl StepScope {
    pub(crate) fn enter<F>(context: &SharedContext, update: F) -> Self
    where
        F: FnOnce(&StepContext) -> StepContext,
    {
        let mut guard = context.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = guard.clone();
        *guard = update(&previous);
        Self {
            context: Arc::clone(context),
            previous: Some(previous),
        }
    }
}

impl Drop for StepScope {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.context.lock().unwrap_or_else(PoisonError::into_inner) = previous;
        }
    }
}

/// Applies timing and outcome policy around a single step.
pub struct StepExecutionHelper {
    transport: Arc<dyn CommandTransport>,
    dialect: Dialect,
    session_id: String,
}

impl StepExecutionHelper {
    pub fn new(transport: Arc<dyn CommandTransport>, dialect: Dialect, session_id: impl Into<String>) -> Self {
        Self {
            transport,
            dialect,
            session_id: session_id.into(),
        }
    }

    /// Sets the driver implicit wait when `timeout_ms` is positive.
    pub async fn apply_timeout(&self, timeout_ms: i64) -> Result<()> {
        if timeout_ms <= 0 {
            return Ok(());
        }

        debug!("Setting driver implicit wait to {} milliseconds", timeout_ms);
        let (command, params) = if self.dialect.is_w3c() {
            (
                DriverCommand::SetTimeouts,
                json!({ "sessionId": self.session_id, "implicit": timeout_ms }),
            )
        } else {
            (
                DriverCommand::ImplicitWait,
                json!({ "sessionId": self.session_id, "ms": timeout_ms as f64 }),
            )
        };
        self.transport.execute(&command, &params).await?;
        Ok(())
    }

    /// Sleeps when `timing` matches `phase`. `quit` never sleeps.
    pub async fn apply_sleep(
        &self,
        timing: SleepTiming,
        duration_ms: u64,
        phase: StepPhase,
        command: Option<&DriverCommand>,
    ) {
        if command.is_some_and(DriverCommand::is_quit) {
            return;
        }

        let matches = matches!(
            (timing, phase),
            (SleepTiming::Before, StepPhase::Before) | (SleepTiming::After, StepPhase::After)
        );
        if matches && duration_ms > 0 {
            debug!("Step is designed to sleep for {} milliseconds {:?} execution", duration_ms, timing);
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }
    }

    /// Final outcome and a message describing how it was reached.
    pub fn resolve_result(passed: bool, invert: bool, always_pass: bool) -> (bool, String) {
        let mut message = String::from(if passed { "Step Passed" } else { "Step Failed" });
        let mut result = passed;

        if invert {
            result = !result;
            message.push_str(". Step result inverted");
        }
        if always_pass {
            result = true;
            message.push_str(". Step marked as forced pass");
        }
        (result, message)
    }

    pub fn should_screenshot(condition: ScreenshotCondition, passed: bool) -> bool {
        match condition {
            ScreenshotCondition::Always => true,
            ScreenshotCondition::Never => false,
            ScreenshotCondition::Success => passed,
            ScreenshotCondition::Failure => !passed,
            ScreenshotCondition::Inherit => false,
        }
    }
}
