use crate::agent::client::AgentClient;
use crate::core::SdkConfig;
use crate::errors::Result;
use crate::types::ReportSettings;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Owns the one live Agent session of the process.
///
/// Acquiring a client always stops the previous one first, so its queued
/// reports are flushed before the next session produces any.
#[derive(Default)]
pub struct SessionRegistry {
    current: Mutex<Option<Arc<AgentClient>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(
        &self,
        config: SdkConfig,
        token: Option<String>,
        capabilities: Map<String, Value>,
        report_settings: ReportSettings,
    ) -> Result<Arc<AgentClient>> {
        let mut current = self.current.lock().await;

        if let Some(previous) = current.take() {
            previous.stop().await;

            if previous.report_settings() == &report_settings && previous.can_reuse_session() {
                previous.restart_queue()?;
                *current = Some(Arc::clone(&previous));
                return Ok(previous);
            }

            info!("Report settings changed, starting a new Agent session");
            previous.close_socket().await;
        }

        let client = Arc::new(AgentClient::start(config, token, capabilities, report_settings).await?);
        *current = Some(Arc::clone(&client));
        Ok(client)
    }

    pub async fn current(&self) -> Option<Arc<AgentClient>> {
        self.current.lock().await.clone()
    }

    /// Stops the live client and releases its socket.
    pub async fn shutdown(&self) {
        if let Some(client) = self.current.lock().await.take() {
            client.stop().await;
            client.close_socket().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::client::tests::{mount_session, test_config};
    use crate::reports::StepReport;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_same_settings_reuse_session() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        let registry = SessionRegistry::new();
        let settings = ReportSettings::new("project", "job");

        let first = registry
            .acquire(test_config(&server), None, Map::new(), settings.clone())
            .await
            .unwrap();
        let second = registry
            .acquire(test_config(&server), None, Map::new(), settings)
            .await
            .unwrap();

        let sessions = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/api/development/session")
            .count();
        assert_eq!(sessions, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.is_socket_open().await);
        assert!(second.is_socket_open().await);

        registry.shutdown().await;
        assert!(registry.current().await.is_none());
        assert!(!second.is_socket_open().await);
    }

    #[tokio::test]
    async fn test_reused_client_keeps_reporting_through_earlier_handles() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("POST"))
            .and(path("/api/development/report/step"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;
        let registry = SessionRegistry::new();
        let settings = ReportSettings::new("project", "job");

        let first = registry
            .acquire(test_config(&server), None, Map::new(), settings.clone())
            .await
            .unwrap();
        first.report_step(StepReport::new("before reuse", "", true));
        registry
            .acquire(test_config(&server), None, Map::new(), settings)
            .await
            .unwrap();
        first.report_step(StepReport::new("after reuse", "", true));

        registry.shutdown().await;
        assert_eq!(first.pending_reports(), 0);

        let delivered: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/api/development/report/step")
            .map(|r| r.body_json::<Value>().unwrap()["description"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(delivered, vec!["before reuse", "after reuse"]);
    }

    #[tokio::test]
    async fn test_different_settings_drain_then_restart() {
        let server = MockServer::start().await;
        mount_session(&server, "2.5.0").await;
        Mock::given(method("POST"))
            .and(path("/api/development/report/step"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let registry = SessionRegistry::new();

        let first = registry
            .acquire(test_config(&server), None, Map::new(), ReportSettings::new("project", "a"))
            .await
            .unwrap();
        for i in 0..3 {
            first.report_step(StepReport::new(format!("step {}", i), "", true));
        }

        let second = registry
            .acquire(test_config(&server), None, Map::new(), ReportSettings::new("project", "b"))
            .await
            .unwrap();
        assert_eq!(first.pending_reports(), 0);
        assert!(!first.is_socket_open().await);

        let paths: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        let last_step = paths
            .iter()
            .rposition(|p| p == "/api/development/report/step")
            .unwrap();
        let second_session = paths
            .iter()
            .rposition(|p| p == "/api/development/session")
            .unwrap();
        assert!(last_step < second_session);
        assert_eq!(paths.iter().filter(|p| p.ends_with("/report/step")).count(), 3);
        assert_eq!(second.report_settings().job_name.as_deref(), Some("b"));

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_old_agent_never_reuses() {
        let server = MockServer::start().await;
        mount_session(&server, "0.64.19").await;
        let registry = SessionRegistry::new();
        let settings = ReportSettings::new("project", "job");

        for _ in 0..2 {
            registry
                .acquire(test_config(&server), None, Map::new(), settings.clone())
                .await
                .unwrap();
        }

        let sessions = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/api/development/session")
            .count();
        assert_eq!(sessions, 2);
        registry.shutdown().await;
    }
}
