use crate::types::By;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome the Agent reports for an addon or codeblock execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionResultType {
    Passed,
    Failed,
    #[default]
    NoResult,
}

impl ExecutionResultType {
    pub fn from_agent(value: Option<&str>) -> Self {
        match value {
            Some("Passed") => ExecutionResultType::Passed,
            _ => ExecutionResultType::Failed,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, ExecutionResultType::Passed)
    }
}

/// A named field returned with an addon execution result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultField {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub output: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AddonExecutionResponse {
    pub result: ExecutionResultType,
    pub message: String,
    pub fields: Vec<ResultField>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionExecutionResponse {
    pub result: ExecutionResultType,
    pub message: String,
    pub outputs: Option<Map<String, Value>>,
}

/// A custom action hosted by an addon installed in the Agent.
///
/// `parameters` carries both inputs and, after execution, the values of
/// the action's output fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionProxy {
    pub guid: String,
    pub class_name: String,
    pub parameters: Map<String, Value>,
    pub locator: Option<(By, String)>,
}

impl ActionProxy {
    pub fn new(guid: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            class_name: class_name.into(),
            parameters: Map::new(),
            locator: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_locator(mut self, by: By, value: impl Into<String>) -> Self {
        self.locator = Some((by, value.into()));
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Request body for `/api/addons/executions`.
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("guid".to_string(), Value::String(self.guid.clone()));
        payload.insert("className".to_string(), Value::String(self.class_name.clone()));
        payload.insert("parameters".to_string(), Value::Object(self.parameters.clone()));
        if let Some((by, value)) = &self.locator {
            payload.insert("by".to_string(), by.addon_locator(value));
        }
        Value::Object(payload)
    }
}
