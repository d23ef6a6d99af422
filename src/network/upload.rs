//! Report upload - posts a file, then polls its processing status
//!
//! One task per upload. The task owns its progress ticker and poll timer;
//! both are dropped as soon as the task returns or its cancel signal fires.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::AppConfig;
use crate::constants::{PROGRESS_CAP, PROGRESS_STEP, PROGRESS_TICK};
use crate::error::{ApiError, ApiResult};
use crate::models::{FileRecord, FileStatus};
use crate::network::client::{ApiClient, ReportFile};

/// Timing of the upload-and-poll sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub calculating_hold: Duration,
    pub progress_tick: Duration,
    pub progress_step: u8,
    pub progress_cap: u8,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PollPolicy {
    fn from(cfg: &AppConfig) -> Self {
        PollPolicy {
            // tokio intervals panic on a zero period
            interval: Duration::from_millis(cfg.poll_interval_ms.max(1)),
            max_attempts: cfg.max_poll_attempts.max(1),
            calculating_hold: Duration::from_millis(cfg.calculating_hold_ms),
            progress_tick: PROGRESS_TICK,
            progress_step: PROGRESS_STEP,
            progress_cap: PROGRESS_CAP,
        }
    }
}

/// What the upload task needs from the API
#[async_trait]
pub trait ReportBackend: Send + Sync {
    async fn upload(
        &self,
        tool_id: i64,
        file: &ReportFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> ApiResult<FileRecord>;

    async fn file_status(&self, file_id: i64) -> ApiResult<FileRecord>;
}

#[async_trait]
impl ReportBackend for ApiClient {
    async fn upload(
        &self,
        tool_id: i64,
        file: &ReportFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> ApiResult<FileRecord> {
        self.upload_file(tool_id, file, progress).await
    }

    async fn file_status(&self, file_id: i64) -> ApiResult<FileRecord> {
        ApiClient::file_status(self, file_id).await
    }
}

/// Progress reported by the upload task
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Upload percentage; capped until the server acknowledges
    Progress(u8),
    /// Server accepted the file; parsing has started
    Uploaded(FileRecord),
    /// Parsing finished; cosmetic pause before completion
    Calculating,
    Complete(FileRecord),
    Failed { message: String, session_expired: bool },
}

impl UploadEvent {
    fn failed(err: &ApiError, fallback: &str) -> Self {
        UploadEvent::Failed {
            message: err.user_message(fallback),
            session_expired: err.is_session_expired(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Complete,
    Failed,
    Cancelled,
}

/// Runs one upload to completion, failure or cancellation.
///
/// Dropping the cancel sender counts as cancellation.
pub async fn run_upload<B: ReportBackend>(
    backend: &B,
    tool_id: i64,
    file: ReportFile,
    policy: PollPolicy,
    events: mpsc::UnboundedSender<UploadEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> UploadOutcome {
    tokio::select! {
        biased;
        _ = &mut cancel_rx => {
            tracing::info!(tool_id, "Upload cancelled");
            UploadOutcome::Cancelled
        }
        outcome = upload_and_poll(backend, tool_id, &file, policy, &events) => outcome,
    }
}

async fn upload_and_poll<B: ReportBackend>(
    backend: &B,
    tool_id: i64,
    file: &ReportFile,
    policy: PollPolicy,
    events: &mpsc::UnboundedSender<UploadEvent>,
) -> UploadOutcome {
    tracing::info!(tool_id, file = %file.file_name, bytes = file.len(), "Uploading report");

    let record = match upload_with_progress(backend, tool_id, file, policy, events).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(tool_id, error = %e, "Upload failed");
            let _ = events.send(UploadEvent::failed(&e, "Upload failed"));
            return UploadOutcome::Failed;
        }
    };

    let _ = events.send(UploadEvent::Progress(100));
    let _ = events.send(UploadEvent::Uploaded(record.clone()));

    match poll_until_processed(backend, record.id, policy).await {
        Ok(processed) => {
            let _ = events.send(UploadEvent::Calculating);
            time::sleep(policy.calculating_hold).await;
            tracing::info!(file_id = processed.id, "Report processed");
            let _ = events.send(UploadEvent::Complete(processed));
            UploadOutcome::Complete
        }
        Err(event) => {
            let _ = events.send(event);
            UploadOutcome::Failed
        }
    }
}

/// Posts the file while advancing a synthetic progress value. The value
/// follows whichever is further along, the timer or native progress, and
/// never passes the cap.
async fn upload_with_progress<B: ReportBackend>(
    backend: &B,
    tool_id: i64,
    file: &ReportFile,
    policy: PollPolicy,
    events: &mpsc::UnboundedSender<UploadEvent>,
) -> ApiResult<FileRecord> {
    let (native_tx, mut native_rx) = mpsc::unbounded_channel();
    let upload = backend.upload(tool_id, file, native_tx);
    tokio::pin!(upload);

    let mut ticker = time::interval_at(Instant::now() + policy.progress_tick, policy.progress_tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut progress = 0u8;
    let _ = events.send(UploadEvent::Progress(progress));

    loop {
        let next = tokio::select! {
            result = &mut upload => return result,
            _ = ticker.tick() => progress.saturating_add(policy.progress_step),
            Some(native) = native_rx.recv() => progress.max(native),
        };
        let next = next.min(policy.progress_cap);
        if next != progress {
            progress = next;
            let _ = events.send(UploadEvent::Progress(progress));
        }
    }
}

/// Checks the file status on a fixed interval until it is terminal or the
/// attempt budget is spent.
async fn poll_until_processed<B: ReportBackend>(
    backend: &B,
    file_id: i64,
    policy: PollPolicy,
) -> Result<FileRecord, UploadEvent> {
    let mut poll = time::interval_at(Instant::now() + policy.interval, policy.interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for attempt in 1..=policy.max_attempts {
        poll.tick().await;
        let record = backend.file_status(file_id).await.map_err(|e| {
            tracing::warn!(file_id, attempt, error = %e, "Status check failed");
            UploadEvent::failed(&e, "Failed to check status")
        })?;

        tracing::debug!(file_id, attempt, status = record.status.as_str(), "Polled file status");
        match record.status {
            FileStatus::Processed => return Ok(record),
            FileStatus::Failed => {
                return Err(UploadEvent::Failed {
                    message: String::from("Processing failed"),
                    session_expired: false,
                })
            }
            FileStatus::Pending | FileStatus::Other(_) => {}
        }
    }

    tracing::warn!(file_id, attempts = policy.max_attempts, "Gave up waiting for processing");
    Err(UploadEvent::Failed {
        message: format!("Processing did not finish after {} checks", policy.max_attempts),
        session_expired: false,
    })
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
