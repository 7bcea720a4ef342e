//! Background delivery of reports to the Agent.
//!
//! Reports are pushed onto an unbounded channel and POSTed by a single worker
//! task, in submission order. The batch variant drains up to `max_batch_size`
//! queued reports per request and sends them as one JSON array.

use crate::errors::{Result, SdkError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

pub const MAX_REPORT_FAILURE_ATTEMPTS: usize = 4;

/// One queued report. An item without a payload tells the worker to wake up
/// and re-check whether it should exit.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub payload: Option<Value>,
    pub url: Option<Url>,
}

impl QueueItem {
    pub fn new(payload: Value, url: Url) -> Self {
        Self {
            payload: Some(payload),
            url: Some(url),
        }
    }

    fn sentinel() -> Self {
        Self {
            payload: None,
            url: None,
        }
    }

    fn is_sentinel(&self) -> bool {
        self.payload.is_none()
    }
}

/// Delivers a single report body to the Agent.
#[async_trait]
pub trait ReportSender: Send + Sync {
    async fn post(&self, url: &Url, token: Option<&str>, body: &Value) -> Result<()>;
}

/// `ReportSender` backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpReportSender {
    client: reqwest::Client,
}

impl HttpReportSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReportSender for HttpReportSender {
    async fn post(&self, url: &Url, token: Option<&str>, body: &Value) -> Result<()> {
        let mut request = self.client.post(url.clone()).json(body);
        if let Some(token) = token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SdkError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Debug, Clone)]
enum QueueMode {
    Single,
    Batch { url: Url, max_batch_size: usize },
}

struct QueueState {
    running: AtomicBool,
    pending: AtomicUsize,
}

pub struct ReportQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
    worker: Mutex<Option<JoinHandle<()>>>,
    state: Arc<QueueState>,
    stop_timeout: Duration,
}

impl ReportQueue {
    /// Starts a queue that POSTs every report to its own endpoint.
    pub fn start(sender: Arc<dyn ReportSender>, token: Option<String>, stop_timeout: Duration) -> Self {
        Self::spawn(sender, token, QueueMode::Single, stop_timeout)
    }

    /// Starts a queue that groups reports into arrays sent to `batch_url`.
    pub fn start_batch(
        sender: Arc<dyn ReportSender>,
        token: Option<String>,
        batch_url: Url,
        max_batch_size: usize,
        stop_timeout: Duration,
    ) -> Self {
        let mode = QueueMode::Batch {
            url: batch_url,
            max_batch_size: max_batch_size.max(1),
        };
        Self::spawn(sender, token, mode, stop_timeout)
    }

    fn spawn(
        sender: Arc<dyn ReportSender>,
        token: Option<String>,
        mode: QueueMode,
        stop_timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState {
            running: AtomicBool::new(true),
            pending: AtomicUsize::new(0),
        });

        debug!(?mode, "Starting reports queue");
        let worker = tokio::spawn(worker_loop(rx, sender, token, mode, Arc::clone(&state)));

        Self {
            tx,
            worker: Mutex::new(Some(worker)),
            state,
            stop_timeout,
        }
    }

    /// Enqueues a report. Never fails; problems are logged.
    pub fn submit(&self, payload: Value, url: Url) {
        if !self.state.running.load(Ordering::SeqCst) {
            warn!("Reports queue is stopped, dropping report for {}", url);
            return;
        }

        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(QueueItem::new(payload, url)).is_err() {
            self.state.pending.fetch_sub(1, Ordering::SeqCst);
            error!("Reports queue worker is gone, report was not queued");
        }
    }

    /// Reports submitted but not yet delivered or given up on.
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Stops accepting reports and waits for the worker to flush what is queued.
    pub async fn stop(&self) {
        self.state.running.store(false, Ordering::SeqCst);
        let _ = self.tx.send(QueueItem::sentinel());

        let Some(mut worker) = self.worker.lock().await.take() else {
            return;
        };

        if tokio::time::timeout(self.stop_timeout, &mut worker).await.is_err() {
            warn!(
                "Reports queue did not finish within {}ms",
                self.stop_timeout.as_millis()
            );
        }

        let pending = self.pending();
        if pending > 0 {
            warn!("There are {} unreported items in the queue", pending);
        }
    }
}

async fn worker_loop(
    mut rx: mpsc::UnboundedReceiver<QueueItem>,
    sender: Arc<dyn ReportSender>,
    token: Option<String>,
    mode: QueueMode,
    state: Arc<QueueState>,
) {
    loop {
        if !state.running.load(Ordering::SeqCst) && state.pending.load(Ordering::SeqCst) == 0 {
            break;
        }

        let Some(first) = rx.recv().await else {
            break;
        };
        if first.is_sentinel() {
            continue;
        }

        match &mode {
            QueueMode::Single => {
                if let (Some(payload), Some(url)) = (first.payload, first.url) {
                    deliver(sender.as_ref(), &url, token.as_deref(), &payload).await;
                }
                state.pending.fetch_sub(1, Ordering::SeqCst);
            }
            QueueMode::Batch {
                url,
                max_batch_size,
            } => {
                let mut batch: Vec<Value> = Vec::with_capacity(*max_batch_size);
                batch.extend(first.payload);
                while batch.len() < *max_batch_size {
                    match rx.try_recv() {
                        Ok(item) => batch.extend(item.payload),
                        Err(_) => break,
                    }
                }

                let count = batch.len();
                debug!("Sending a batch of {} reports", count);
                deliver(sender.as_ref(), url, token.as_deref(), &Value::Array(batch)).await;
                state.pending.fetch_sub(count, Ordering::SeqCst);
            }
        }
    }
    debug!("Reports queue worker finished");
}

async fn deliver(sender: &dyn ReportSender, url: &Url, token: Option<&str>, body: &Value) -> bool {
    for attempt in 1..=MAX_REPORT_FAILURE_ATTEMPTS {
        match sender.post(url, token, body).await {
            Ok(()) => return true,
            Err(e) => {
                warn!("Failed to submit report to {}: {}", url, e);
                let remaining = MAX_REPORT_FAILURE_ATTEMPTS - attempt;
                if remaining > 0 {
                    info!("Report submission will be retried {} more time(s)", remaining);
                }
            }
        }
    }
    error!(
        "Failed to submit report after {} attempts",
        MAX_REPORT_FAILURE_ATTEMPTS
    );
    false
}
