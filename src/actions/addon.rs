use crate::actions::base::{ActionProxy, ResultField};
use crate::errors::{Result, SdkError};
use crate::executor::{ReportingCommandExecutor, StepExecutionHelper, StepPhase};
use crate::reports::StepReport;
use serde_json::Map;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs addon actions through the same step pipeline as driver commands.
pub struct AddonHelper {
    executor: Arc<ReportingCommandExecutor>,
}

impl AddonHelper {
    pub fn new(executor: Arc<ReportingCommandExecutor>) -> Self {
        Self { executor }
    }

    /// Executes `action` and returns it with its output fields filled in.
    pub async fn execute(&self, mut action: ActionProxy) -> Result<ActionProxy> {
        let executor = &self.executor;
        executor.update_known_test_name();
        let settings = executor.settings();
        let helper = executor.helper();

        helper.apply_timeout(settings.timeout_ms).await?;
        helper
            .apply_sleep(settings.sleep_timing, settings.sleep_time_ms, StepPhase::Before, None)
            .await;

        let response = executor.link().execute_proxy(&action).await?;

        helper
            .apply_sleep(settings.sleep_timing, settings.sleep_time_ms, StepPhase::After, None)
            .await;

        let (passed, message) = StepExecutionHelper::resolve_result(
            response.result.is_passed(),
            settings.invert_result,
            settings.always_pass,
        );
        let description = format!("Execute '{}'", action.class_name);

        if executor.flags().disable_reports {
            debug!("Step [{}] - [{}]", description, if passed { "Passed" } else { "Failed" });
        } else {
            let screenshot = if StepExecutionHelper::should_screenshot(settings.screenshot_condition, passed) {
                executor.create_screenshot().await
            } else {
                None
            };
            let outputs: Map<String, _> = response
                .fields
                .iter()
                .filter(|f| f.output)
                .map(|f| (f.name.clone(), f.value.clone()))
                .collect();

            let report = StepReport::new(description, message, passed)
                .with_screenshot(screenshot)
                .with_element(action.locator.as_ref().map(|(by, value)| by.search_criteria(value)))
                .with_inputs(Some(action.parameters.clone()))
                .with_outputs(Some(outputs));
            executor.submit_step(report);
        }

        if !passed {
            return Err(SdkError::Sdk(format!(
                "Error occurred during addon action execution: {}",
                response.message
            )));
        }

        apply_outputs(&mut action, &response.fields);
        Ok(action)
    }
}

fn apply_outputs(action: &mut ActionProxy, fields: &[ResultField]) {
    for field in fields.iter().filter(|f| f.output) {
        match action.parameters.get_mut(&field.name) {
            Some(value) => *value = field.value.clone(),
            None => warn!(
                "Action '{}' does not have a field named '{}'",
                action.guid, field.name
            ),
        }
    }
}
