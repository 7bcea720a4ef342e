use crate::actions::{ActionExecutionResponse, ActionProxy, AddonExecutionResponse};
use crate::agent::session::AgentSession;
use crate::errors::Result;
use crate::reports::{CommandReport, CustomTestReport, StepReport};
use async_trait::async_trait;
use serde_json::Value;

/// What command execution needs from a connected Agent.
#[async_trait]
pub trait AgentLink: Send + Sync {
    fn session(&self) -> &AgentSession;

    fn report_command(&self, report: CommandReport);

    fn report_step(&self, report: StepReport);

    fn report_test(&self, report: CustomTestReport);

    async fn execute_proxy(&self, action: &ActionProxy) -> Result<AddonExecutionResponse>;

    async fn execute_action(&self, guid: &str, body: &Value) -> Result<ActionExecutionResponse>;
}
