//! Masks typed secrets before commands reach the report.

use crate::core::DriverCommand;
use crate::executor::reporting::ReportingCommandExecutor;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const REDACTED_TEXT: &str = "***";

const SECURE_ELEMENT_TYPES: [&str; 2] = ["password", "XCUIElementTypeSecureTextField"];

/// Returns `params` with the typed text masked when the target element is a
/// password field. Probes run as internal commands and are never reported.
pub async fn redact_command(
    executor: &ReportingCommandExecutor,
    command: &DriverCommand,
    params: &Value,
) -> Value {
    if !matches!(
        command,
        DriverCommand::SendKeysToElement | DriverCommand::SendKeysToActiveElement
    ) {
        return params.clone();
    }

    let element_id = params.get("id").cloned().unwrap_or(Value::Null);
    if !redaction_required(executor, &element_id).await {
        return params.clone();
    }

    debug!("Redacting text typed into element {}", element_id);
    let mut redacted = params.clone();
    if let Some(map) = redacted.as_object_mut() {
        map.insert("text".to_string(), json!(REDACTED_TEXT));
        map.insert("value".to_string(), json!(["*", "*", "*"]));
    }
    redacted
}

async fn redaction_required(executor: &ReportingCommandExecutor, element_id: &Value) -> bool {
    let session = executor.session();
    let platform = session.capability("platformName").unwrap_or_default();
    let browser = session.capability("browserName").unwrap_or_default();

    let native_android = platform.eq_ignore_ascii_case("android") && browser.is_empty();
    let attribute = if native_android { "password" } else { "type" };

    let params = json!({
        "sessionId": session.session_id,
        "id": element_id,
        "name": attribute,
    });

    match executor
        .execute_internal(&DriverCommand::GetElementAttribute, &params)
        .await
    {
        Ok(response) => {
            let value = match &response.value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                _ => String::new(),
            };
            if native_android {
                value.eq_ignore_ascii_case("true")
            } else {
                SECURE_ELEMENT_TYPES.contains(&value.as_str())
            }
        }
        Err(e) => {
            warn!("Could not determine whether element {} holds a secret, redacting: {}", element_id, e);
            true
        }
    }
}
