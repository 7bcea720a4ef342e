use crate::actions::base::ActionExecutionResponse;
use crate::agent::AgentLink;
use crate::errors::Result;
use crate::types::By;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

/// Identifiers of the built-in codeblocks hosted by the Agent.
pub mod guids {
    pub const PAUSE: &str = "5ac5d621-7a53-45a6-94e5-a3348be3969e";

    pub const SEND_KEYS: &str = "928bf14e-7a56-4371-b92a-9cb9de53f632";
    pub const IS_SELECTED: &str = "2c399e26-8d02-41a7-a8d4-acfeda14fb5b";
    pub const IS_PRESENT: &str = "a9ab4ae7-38ca-4451-a636-1b801a774503";
    pub const IS_VISIBLE: &str = "7314f516-588b-4dff-bf0e-7016c7e02a4b";
    pub const CONTAINS_TEXT: &str = "85da72d0-c5a4-4587-be33-8cb3b5fa7910";
    pub const IS_CLICKABLE: &str = "a59f3a20-d08d-4293-9add-b279f92e6c41";
    pub const CLICK_IF_VISIBLE: &str = "27fd3f33-9b63-4dc4-97e9-fcf494cbffdb";
    pub const IS_INVISIBLE: &str = "104373b7-868c-44ba-bbd2-e16089ad2e48";
    pub const TYPE_TEXT: &str = "6f94fdaa-0041-4265-b73b-ecfcbe702d66";
    pub const CLEAR_CONTENTS: &str = "511ddb4e-210f-4f3f-9fb9-b766bb23ee6a";
    pub const GET_TEXT: &str = "225caec3-3231-45d5-a3f3-c4c59b7ab385";
    pub const CLICK: &str = "02d572b2-d610-4700-9ad3-40076ddb9807";
    pub const GET_TITLE: &str = "c168339f-55c4-4c0d-91fc-cd9d4b8c7574";

    pub const MOVE_MOUSE_TO_ELEMENT: &str = "631118c0-4828-42c8-aa69-0e6107d5956d";
    pub const NAVIGATE_FORWARD: &str = "664577f4-e1d2-4c46-b499-3934b447b478";
    pub const NAVIGATE_BACK: &str = "43b4408f-3fa1-4ec5-80cd-872d6dff7628";
    pub const REFRESH: &str = "3a06acbf-9138-4392-bca1-c1946886b65d";
    pub const NAVIGATE_TO_URL: &str = "49c5d8d8-4ba8-42f0-823d-702e6acfb23a";
    pub const GET_CURRENT_URL: &str = "56a4ad1b-b563-4322-ba29-d165090302b2";
    pub const SCROLL_WINDOW: &str = "a5d4eb31-51f0-4c62-8832-60c6bcd51a16";
    pub const SELECT_ALL_OPTIONS_BY_VALUE: &str = "45fdd921-b359-4d6a-b7c5-5f9a3612c0f2";
    pub const SWITCH_TO_WINDOW: &str = "3a7a12fb-66a4-47c2-aaf0-deeb7b1f748a";
    pub const CLOSE_WINDOW: &str = "6cc71ddb-1aaf-433c-aa94-56d944aac433";
}

/// Codeblocks executed by the Agent on the session's driver.
///
/// Every request carries `_timeout`; element actions also carry the
/// `elementSearchCriteria` built from their locator.
pub struct CodeblockActions {
    link: Arc<dyn AgentLink>,
    timeout_ms: u64,
}

impl CodeblockActions {
    pub fn new(link: Arc<dyn AgentLink>) -> Self {
        Self {
            link,
            timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub async fn execute(
        &self,
        guid: &str,
        mut body: Map<String, Value>,
        locator: Option<(By, &str)>,
    ) -> Result<ActionExecutionResponse> {
        body.insert("_timeout".to_string(), json!(self.timeout_ms));
        if let Some((by, value)) = locator {
            body.insert("elementSearchCriteria".to_string(), by.search_criteria(value).to_json());
        }

        let response = self.link.execute_action(guid, &Value::Object(body)).await?;
        if !response.result.is_passed() {
            warn!(
                "Failed to execute action '{}', agent returned the following message: {}",
                guid, response.message
            );
        }
        Ok(response)
    }

    async fn passed(&self, guid: &str, body: Map<String, Value>, locator: Option<(By, &str)>) -> Result<bool> {
        Ok(self.execute(guid, body, locator).await?.result.is_passed())
    }

    /// Output `name` of a passed codeblock.
    async fn output(
        &self,
        guid: &str,
        locator: Option<(By, &str)>,
        name: &str,
    ) -> Result<Option<String>> {
        let response = self.execute(guid, Map::new(), locator).await?;
        if !response.result.is_passed() {
            return Ok(None);
        }
        Ok(response
            .outputs
            .as_ref()
            .and_then(|o| o.get(name))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub async fn pause(&self, milliseconds: u64) -> Result<bool> {
        self.passed(guids::PAUSE, body([("milliseconds", json!(milliseconds))]), None)
            .await
    }

    pub async fn click(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::CLICK, Map::new(), Some((by, value))).await
    }

    pub async fn click_if_visible(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::CLICK_IF_VISIBLE, Map::new(), Some((by, value))).await
    }

    pub async fn send_keys(&self, text: &str, by: By, value: &str) -> Result<bool> {
        self.passed(guids::TYPE_TEXT, body([("keys", json!(text))]), Some((by, value)))
            .await
    }

    /// Types `keys` into the focused window.
    pub async fn send_keys_to_window(&self, keys: &[&str]) -> Result<bool> {
        self.passed(guids::SEND_KEYS, body([("text", json!(keys.join(",")))]), None)
            .await
    }

    pub async fn clear_contents(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::CLEAR_CONTENTS, Map::new(), Some((by, value))).await
    }

    pub async fn contains_text(&self, text: &str, by: By, value: &str) -> Result<bool> {
        self.passed(guids::CONTAINS_TEXT, body([("text", json!(text))]), Some((by, value)))
            .await
    }

    pub async fn is_selected(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::IS_SELECTED, Map::new(), Some((by, value))).await
    }

    pub async fn is_present(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::IS_PRESENT, Map::new(), Some((by, value))).await
    }

    pub async fn is_visible(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::IS_VISIBLE, Map::new(), Some((by, value))).await
    }

    pub async fn is_invisible(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::IS_INVISIBLE, Map::new(), Some((by, value))).await
    }

    pub async fn is_clickable(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::IS_CLICKABLE, Map::new(), Some((by, value))).await
    }

    pub async fn get_text(&self, by: By, value: &str) -> Result<Option<String>> {
        self.output(guids::GET_TEXT, Some((by, value)), "text").await
    }

    pub async fn get_title(&self) -> Result<Option<String>> {
        self.output(guids::GET_TITLE, None, "title").await
    }

    pub async fn move_mouse_to_element(&self, by: By, value: &str) -> Result<bool> {
        self.passed(guids::MOVE_MOUSE_TO_ELEMENT, Map::new(), Some((by, value)))
            .await
    }

    pub async fn navigate_forward(&self) -> Result<bool> {
        self.passed(guids::NAVIGATE_FORWARD, Map::new(), None).await
    }

    pub async fn navigate_back(&self) -> Result<bool> {
        self.passed(guids::NAVIGATE_BACK, Map::new(), None).await
    }

    pub async fn refresh(&self) -> Result<bool> {
        self.passed(guids::REFRESH, Map::new(), None).await
    }

    pub async fn navigate_to_url(&self, url: &str) -> Result<bool> {
        self.passed(guids::NAVIGATE_TO_URL, body([("url", json!(url))]), None)
            .await
    }

    pub async fn get_current_url(&self) -> Result<Option<String>> {
        self.output(guids::GET_CURRENT_URL, None, "url").await
    }

    pub async fn scroll_window(&self, x: i64, y: i64) -> Result<bool> {
        self.passed(guids::SCROLL_WINDOW, body([("x", json!(x)), ("y", json!(y))]), None)
            .await
    }

    pub async fn select_all_options_by_value(&self, by: By, value: &str, option: &str) -> Result<bool> {
        self.passed(
            guids::SELECT_ALL_OPTIONS_BY_VALUE,
            body([("value", json!(option))]),
            Some((by, value)),
        )
        .await
    }

    pub async fn switch_to_window(&self, index: usize) -> Result<bool> {
        self.passed(guids::SWITCH_TO_WINDOW, body([("index", json!(index))]), None)
            .await
    }

    pub async fn close_window(&self, index: usize) -> Result<bool> {
        self.passed(guids::CLOSE_WINDOW, body([("index", json!(index))]), None)
            .await
    }
}

fn body<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ExecutionResultType;
    use crate::agent::client::tests::{mount_session, test_config};
    use crate::agent::{AgentClient, AgentSession};
    use crate::testing::RecordingLink;
    use crate::types::{Dialect, ReportSettings};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn actions_with(response: ActionExecutionResponse) -> (Arc<RecordingLink>, CodeblockActions) {
        let link = Arc::new(
            RecordingLink::new(AgentSession::new("s1", Dialect::W3C)).with_action_response(response),
        );
        (link.clone(), CodeblockActions::new(link))
    }

    fn passed(outputs: Option<Value>) -> ActionExecutionResponse {
        ActionExecutionResponse {
            result: ExecutionResultType::Passed,
            message: String::new(),
            outputs: outputs.and_then(|o| o.as_object().cloned()),
        }
    }

    #[tokio::test]
    async fn test_element_action_body() {
        let (link, actions) = actions_with(passed(None));
        assert!(actions.send_keys("hello", By::CssSelector, "#q").await.unwrap());

        let codeblocks = link.codeblocks();
        assert_eq!(codeblocks.len(), 1);
        let (guid, body) = &codeblocks[0];
        assert_eq!(guid, guids::TYPE_TEXT);
        assert_eq!(
            body,
            &json!({
                "keys": "hello",
                "_timeout": DEFAULT_ACTION_TIMEOUT_MS,
                "elementSearchCriteria": {"byType": "CSSSELECTOR", "byValue": "#q", "index": -1},
            })
        );
    }

    #[tokio::test]
    async fn test_pause_uses_configured_timeout_and_no_locator() {
        let (link, actions) = actions_with(passed(None));
        let actions = actions.with_timeout(2_500);
        assert!(actions.pause(300).await.unwrap());

        let (guid, body) = &link.codeblocks()[0];
        assert_eq!(guid, guids::PAUSE);
        assert_eq!(body, &json!({"milliseconds": 300, "_timeout": 2_500}));
    }

    #[tokio::test]
    async fn test_outputs_read_from_passed_actions_only() {
        let (_, actions) = actions_with(passed(Some(json!({"title": "Home"}))));
        assert_eq!(actions.get_title().await.unwrap().as_deref(), Some("Home"));

        let (_, actions) = actions_with(ActionExecutionResponse {
            result: ExecutionResultType::Failed,
            message: "no such element".to_string(),
            outputs: Some(Map::new()),
        });
        assert!(actions.get_text(By::Id, "missing").await.unwrap().is_none());
        assert!(!actions.click(By::Id, "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_keys_are_joined() {
        let (link, actions) = actions_with(passed(None));
        actions.send_keys_to_window(&["a", "b", "c"]).await.unwrap();
        assert_eq!(link.codeblocks()[0].1["text"], "a,b,c");
    }

    #[tokio::test]
    async fn test_codeblock_reaches_agent() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("POST"))
            .and(path(format!("/api/codeblocks/executions/{}", guids::GET_CURRENT_URL)))
            .and(body_partial_json(json!({"_timeout": DEFAULT_ACTION_TIMEOUT_MS})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resultType": "Passed",
                "outputs": {"url": "https://example.test/"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(
            AgentClient::start(test_config(&server), None, Map::new(), ReportSettings::default())
                .await
                .unwrap(),
        );
        let actions = CodeblockActions::new(client.clone());
        assert_eq!(
            actions.get_current_url().await.unwrap().as_deref(),
            Some("https://example.test/")
        );

        client.stop().await;
        client.close_socket().await;
    }
}
