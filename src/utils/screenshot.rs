use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

pub struct ScreenshotManager;

impl ScreenshotManager {
    pub fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    /// Base64 PNG from a driver screenshot response value.
    ///
    /// Drivers answer either with the encoded string itself or with raw bytes.
    pub fn from_response_value(value: &Value) -> Option<String> {
        match value {
            Value::String(data) if !data.is_empty() => Some(data.replace(['\n', '\r'], "")),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .filter(|bytes| !bytes.is_empty())
                .map(|bytes| Self::encode(&bytes)),
            _ => None,
        }
    }
}
