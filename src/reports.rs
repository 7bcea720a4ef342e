//! Report payloads sent to the Agent.

use crate::core::DriverCommand;
use crate::types::ElementSearchCriteria;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportItemType {
    Command,
    Step,
    Test,
}

/// A driver command as it appears in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReport {
    #[serde(rename = "commandName")]
    pub command: DriverCommand,
    #[serde(rename = "commandParameters")]
    pub command_params: Value,
    pub result: Value,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(rename = "type")]
    item_type: ReportItemType,
}

impl CommandReport {
    pub fn new(command: DriverCommand, command_params: Value, result: Value, passed: bool) -> Self {
        Self {
            command,
            command_params,
            result,
            passed,
            message: None,
            screenshot: None,
            item_type: ReportItemType::Command,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_screenshot(mut self, screenshot: Option<String>) -> Self {
        self.screenshot = screenshot;
        self
    }
}

/// A manual or synthetic step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub guid: String,
    pub description: String,
    pub message: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementSearchCriteria>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_parameters: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_parameters: Option<Map<String, Value>>,
    #[serde(rename = "type")]
    item_type: ReportItemType,
}

impl StepReport {
    pub fn new(description: impl Into<String>, message: impl Into<String>, passed: bool) -> Self {
        Self {
            guid: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            message: message.into(),
            passed,
            screenshot: None,
            element: None,
            input_parameters: None,
            output_parameters: None,
            item_type: ReportItemType::Step,
        }
    }

    pub fn with_screenshot(mut self, screenshot: Option<String>) -> Self {
        self.screenshot = screenshot;
        self
    }

    pub fn with_element(mut self, element: Option<ElementSearchCriteria>) -> Self {
        self.element = element;
        self
    }

    pub fn with_inputs(mut self, inputs: Option<Map<String, Value>>) -> Self {
        self.input_parameters = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Option<Map<String, Value>>) -> Self {
        self.output_parameters = outputs;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomTestReport {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "type")]
    item_type: ReportItemType,
}

impl CustomTestReport {
    pub fn new(name: impl Into<String>, passed: bool, message: Option<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            message,
            item_type: ReportItemType::Test,
        }
    }
}

/// Outcome of a single HTTP exchange with the Agent.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    pub passed: bool,
    pub status_code: u16,
    pub message: String,
    pub data: Option<Value>,
}

impl OperationResult {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FindByType;
    use serde_json::json;

    #[test]
    fn test_command_report_json() {
        let report = CommandReport::new(
            DriverCommand::Other("findElement".to_string()),
            json!({"using": "css selector", "value": "#q"}),
            json!({"element-6066": "abc"}),
            true,
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "commandName": "findElement",
                "commandParameters": {"using": "css selector", "value": "#q"},
                "result": {"element-6066": "abc"},
                "passed": true,
                "type": "Command",
            })
        );
    }

    #[test]
    fn test_command_report_with_screenshot() {
        let report = CommandReport::new(DriverCommand::Quit, json!({}), json!(null), false)
            .with_message("Step Failed")
            .with_screenshot(Some("aGVsbG8=".to_string()));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["screenshot"], "aGVsbG8=");
        assert_eq!(json["message"], "Step Failed");
    }

    #[test]
    fn test_step_report_json_without_optionals() {
        let report = StepReport::new("my_description", "my_message", true);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            json!({
                "guid": report.guid,
                "description": "my_description",
                "message": "my_message",
                "passed": true,
                "type": "Step",
            })
        );
        assert!(uuid::Uuid::parse_str(&report.guid).is_ok());
    }

    #[test]
    fn test_step_report_with_element_and_parameters() {
        let mut inputs = Map::new();
        inputs.insert("username".to_string(), json!("john"));
        let report = StepReport::new("Login", "ok", false)
            .with_element(Some(ElementSearchCriteria::new(FindByType::Id, "user")))
            .with_inputs(Some(inputs))
            .with_screenshot(Some("c2NyZWVu".to_string()));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["element"], json!({"byType": "ID", "byValue": "user", "index": -1}));
        assert_eq!(json["inputParameters"]["username"], "john");
        assert_eq!(json["screenshot"], "c2NyZWVu");
        assert!(json.get("outputParameters").is_none());
    }

    #[test]
    fn test_step_reports_get_unique_guids() {
        let a = StepReport::new("a", "", true);
        let b = StepReport::new("a", "", true);
        assert_ne!(a.guid, b.guid);
    }

    #[test]
    fn test_custom_test_report_json() {
        let report = CustomTestReport::new("login works", true, None);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"name": "login works", "passed": true, "type": "Test"})
        );
    }
}
