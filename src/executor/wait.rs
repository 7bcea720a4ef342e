use crate::errors::{Result, SdkError};
use crate::executor::reporting::ReportingCommandExecutor;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Explicit wait; commands issued while polling are collapsed into a single report.
pub struct DriverWait<'a> {
    executor: &'a ReportingCommandExecutor,
    timeout: Duration,
    poll_interval: Duration,
}

impl<'a> DriverWait<'a> {
    pub fn new(executor: &'a ReportingCommandExecutor, timeout: Duration) -> Self {
        Self {
            executor,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Polls `condition` until it yields a value. Errors count as "not yet".
    pub async fn until<T, F, Fut>(&self, mut condition: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let _polling = self.executor.polling_scope();
        let deadline = Instant::now() + self.timeout;
        let mut last_error = None;

        loop {
            match condition().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => {
                    debug!("Wait condition not met yet: {}", e);
                    last_error = Some(e);
                }
            }

            if Instant::now() + self.poll_interval > deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        let mut message = format!("Condition not met within {}ms", self.timeout.as_millis());
        if let Some(e) = last_error {
            message.push_str(&format!(": {}", e));
        }
        Err(SdkError::Timeout(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSession;
    use crate::core::{CommandResponse, DriverCommand, SdkConfig};
    use crate::testing::{RecordingLink, RecordingTransport};
    use crate::types::Dialect;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn setup(transport: RecordingTransport) -> (Arc<RecordingLink>, ReportingCommandExecutor) {
        let link = Arc::new(RecordingLink::new(AgentSession::new("s1", Dialect::W3C)));
        let executor = ReportingCommandExecutor::new(link.clone(), Arc::new(transport), &SdkConfig::default());
        (link, executor)
    }

    #[tokio::test]
    async fn test_until_collapses_polled_commands() {
        let (link, executor) = setup(RecordingTransport::default());
        let attempts = AtomicUsize::new(0);
        let find = DriverCommand::Other("findElement".to_string());

        let (executor_ref, find_ref, attempts_ref) = (&executor, &find, &attempts);
        let value = DriverWait::new(&executor, Duration::from_secs(5))
            .with_poll_interval(Duration::from_millis(10))
            .until(|| async move {
                executor_ref.execute(find_ref, &json!({})).await?;
                let n = attempts_ref.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, SdkError>(if n == 3 { Some(n) } else { None })
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert!(!executor.is_polling());
        assert!(link.commands().is_empty());

        executor.clear_stash();
        assert_eq!(link.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_until_times_out() {
        let (_, executor) = setup(
            RecordingTransport::default()
                .with_response("findElement", CommandResponse::failed(7, json!("no such element"))),
        );

        let result: Result<()> = DriverWait::new(&executor, Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(10))
            .until(|| async { Err(SdkError::Sdk("element not visible".to_string())) })
            .await;

        match result {
            Err(SdkError::Timeout(message)) => assert!(message.contains("element not visible")),
            _ => panic!("expected a timeout"),
        }
        assert!(!executor.is_polling());
    }
}
