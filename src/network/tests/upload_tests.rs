use super::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted backend; statuses are served in order, the last one repeats
struct FakeBackend {
    upload_delay: Duration,
    native_progress: Vec<u8>,
    upload_error: Option<(u16, &'static str)>,
    /// From this call on (1-based) the status check errors
    status_error_after: Option<(usize, u16, &'static str)>,
    statuses: Mutex<VecDeque<FileStatus>>,
    status_calls: AtomicUsize,
}

impl FakeBackend {
    fn new(statuses: &[FileStatus]) -> Self {
        FakeBackend {
            upload_delay: Duration::from_millis(500),
            native_progress: Vec::new(),
            upload_error: None,
            status_error_after: None,
            statuses: Mutex::new(statuses.iter().cloned().collect()),
            status_calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportBackend for FakeBackend {
    async fn upload(
        &self,
        _tool_id: i64,
        file: &ReportFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> ApiResult<FileRecord> {
        for pct in &self.native_progress {
            let _ = progress.send(*pct);
            tokio::task::yield_now().await;
        }
        time::sleep(self.upload_delay).await;
        if let Some((status, body)) = self.upload_error {
            return Err(ApiError::from_response(status, body));
        }
        Ok(FileRecord {
            id: 42,
            filename: file.file_name.clone(),
            file_type: None,
            size: Some(file.len()),
            status: FileStatus::Pending,
            created_at: None,
        })
    }

    async fn file_status(&self, file_id: i64) -> ApiResult<FileRecord> {
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((from, status, body)) = self.status_error_after {
            if call >= from {
                return Err(ApiError::from_response(status, body));
            }
        }
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().cloned().unwrap_or(FileStatus::Pending)
        };
        Ok(FileRecord {
            id: file_id,
            filename: "scan.nessus".into(),
            file_type: None,
            size: None,
            status,
            created_at: None,
        })
    }
}

fn report() -> ReportFile {
    ReportFile {
        file_name: "scan.nessus".into(),
        bytes: Arc::new(vec![0u8; 1024]),
    }
}

async fn drain(rx: &mut mpsc::UnboundedReceiver<UploadEvent>) -> Vec<UploadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Progress values seen before the server acknowledged the upload
fn progress_before_ack(events: &[UploadEvent]) -> Vec<u8> {
    events
        .iter()
        .take_while(|e| !matches!(e, UploadEvent::Uploaded(_)))
        .filter_map(|e| match e {
            UploadEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_processed_file_goes_through_calculating_to_complete() {
    let backend = FakeBackend::new(&[FileStatus::Pending, FileStatus::Pending, FileStatus::Processed]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    let outcome = run_upload(&backend, 3, report(), PollPolicy::default(), tx, cancel_rx).await;

    assert_eq!(outcome, UploadOutcome::Complete);
    assert_eq!(backend.calls(), 3);
    let events = drain(&mut rx).await;
    let tail: Vec<_> = events.iter().rev().take(2).collect();
    assert!(matches!(tail[0], UploadEvent::Complete(r) if r.status == FileStatus::Processed));
    assert_eq!(tail[1], &UploadEvent::Calculating);
    assert!(events.contains(&UploadEvent::Progress(100)));
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_capped_until_the_server_answers() {
    let mut backend = FakeBackend::new(&[FileStatus::Processed]);
    backend.upload_delay = Duration::from_secs(10);
    backend.native_progress = vec![35, 99, 100];
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    run_upload(&backend, 3, report(), PollPolicy::default(), tx, cancel_rx).await;

    let events = drain(&mut rx).await;
    let before = progress_before_ack(&events);
    assert!(before.iter().all(|p| *p <= 90), "progress ran past the cap: {:?}", before);
    assert_eq!(before.last(), Some(&90));
    assert!(before.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {:?}", before);
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_stops_polling() {
    let backend = FakeBackend::new(&[FileStatus::Pending, FileStatus::Failed]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    let outcome = run_upload(&backend, 3, report(), PollPolicy::default(), tx, cancel_rx).await;
    assert_eq!(outcome, UploadOutcome::Failed);

    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.calls(), 2);
    let events = drain(&mut rx).await;
    assert_eq!(
        events.last(),
        Some(&UploadEvent::Failed {
            message: "Processing failed".into(),
            session_expired: false
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_polling_gives_up_after_max_attempts() {
    let backend = FakeBackend::new(&[FileStatus::Pending]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    let started = Instant::now();
    let outcome = run_upload(&backend, 3, report(), PollPolicy::default(), tx, cancel_rx).await;

    assert_eq!(outcome, UploadOutcome::Failed);
    assert_eq!(backend.calls(), 30);
    // 30 checks, 2s apart, after the upload itself
    assert!(started.elapsed() >= Duration::from_secs(60));
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.calls(), 30);
    assert!(matches!(drain(&mut rx).await.last(), Some(UploadEvent::Failed { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_upload_error_reports_server_detail_without_polling() {
    let mut backend = FakeBackend::new(&[FileStatus::Processed]);
    backend.upload_error = Some((400, r#"{"detail": "Unsupported file type"}"#));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    let outcome = run_upload(&backend, 3, report(), PollPolicy::default(), tx, cancel_rx).await;

    assert_eq!(outcome, UploadOutcome::Failed);
    assert_eq!(backend.calls(), 0);
    assert_eq!(
        drain(&mut rx).await.last(),
        Some(&UploadEvent::Failed {
            message: "Unsupported file type".into(),
            session_expired: false
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_the_poll_loop() {
    let backend = Arc::new(FakeBackend::new(&[FileStatus::Pending]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();

    let task = {
        let backend = backend.clone();
        tokio::spawn(async move {
            run_upload(backend.as_ref(), 3, report(), PollPolicy::default(), tx, cancel_rx).await
        })
    };

    // Upload (0.5s) plus three polls
    time::sleep(Duration::from_millis(6_600)).await;
    assert_eq!(backend.calls(), 3);
    cancel_tx.send(()).unwrap();

    assert_eq!(task.await.unwrap(), UploadOutcome::Cancelled);
    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(backend.calls(), 3);
    assert!(drain(&mut rx)
        .await
        .iter()
        .all(|e| !matches!(e, UploadEvent::Failed { .. } | UploadEvent::Complete(_))));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_cancel_handle_also_cancels() {
    let backend = FakeBackend::new(&[FileStatus::Pending]);
    let (tx, _rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    drop(cancel_tx);

    let outcome = run_upload(&backend, 3, report(), PollPolicy::default(), tx, cancel_rx).await;
    assert_eq!(outcome, UploadOutcome::Cancelled);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_poll_interval_in_config_still_polls() {
    let cfg = AppConfig {
        poll_interval_ms: 0,
        ..AppConfig::default()
    };
    let policy = PollPolicy::from(&cfg);
    assert!(!policy.interval.is_zero());

    let backend = FakeBackend::new(&[FileStatus::Pending, FileStatus::Processed]);
    let (tx, _rx) = mpsc::unbounded_channel();
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    let outcome = run_upload(&backend, 3, report(), policy, tx, cancel_rx).await;
    assert_eq!(outcome, UploadOutcome::Complete);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_status_request_error_fails_the_upload() {
    let mut backend = FakeBackend::new(&[FileStatus::Pending]);
    backend.status_error_after = Some((2, 503, r#"{"detail": "Database unavailable"}"#));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_cancel_tx, cancel_rx) = oneshot::channel();

    let outcome = run_upload(&backend, 3, report(), PollPolicy::default(), tx, cancel_rx).await;

    assert_eq!(outcome, UploadOutcome::Failed);
    assert_eq!(backend.calls(), 2);
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.calls(), 2);
    assert_eq!(
        drain(&mut rx).await.last(),
        Some(&UploadEvent::Failed {
            message: "Database unavailable".into(),
            session_expired: false
        })
    );
}
