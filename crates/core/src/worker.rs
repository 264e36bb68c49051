use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::session::RunRequest;

/// 背景執行緒相關錯誤。 / Errors from the background runner.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn pipeline worker: {0}")]
    Spawn(#[from] io::Error),
}

/// 完成的一次執行。 / A finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub ticket: u64,
    pub request: RunRequest,
    pub outcome: PipelineOutcome,
}

struct Job {
    ticket: u64,
    request: RunRequest,
}

type Notifier = Box<dyn Fn() + Send>;

/// Runs pipeline requests one at a time on a dedicated thread.
///
/// Requests submitted while a run is in flight are queued; when the thread
/// becomes free it skips to the newest queued request. Only the result for
/// the most recently submitted ticket is ever handed back by [`poll`](Self::poll).
pub struct PipelineWorker {
    jobs: Option<Sender<Job>>,
    results: Receiver<RunResult>,
    latest_ticket: u64,
    delivered_ticket: u64,
    handle: Option<JoinHandle<()>>,
}

impl PipelineWorker {
    pub fn spawn(pipeline: Pipeline) -> Result<Self, WorkerError> {
        Self::spawn_with_notifier(pipeline, Box::new(|| {}))
    }

    /// `notify` 會在每次送出結果後被呼叫（例如要求 UI 重繪）。 /
    /// `notify` runs after every delivered result, e.g. to request a UI repaint.
    pub fn spawn_with_notifier(pipeline: Pipeline, notify: Notifier) -> Result<Self, WorkerError> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("slnview-pipeline".into())
            .spawn(move || run_loop(pipeline, job_rx, result_tx, notify))?;

        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            latest_ticket: 0,
            delivered_ticket: 0,
            handle: Some(handle),
        })
    }

    /// 提交請求並回傳其票號；較舊的待處理請求將被取代。 /
    /// Submits a request and returns its ticket; older pending requests are superseded.
    pub fn submit(&mut self, request: RunRequest) -> u64 {
        self.latest_ticket += 1;
        let ticket = self.latest_ticket;
        if let Some(jobs) = &self.jobs {
            if jobs.send(Job { ticket, request }).is_err() {
                tracing::error!(ticket, "pipeline worker has stopped");
            }
        }
        ticket
    }

    /// 是否仍有最新請求尚未完成。 / Whether the newest request is still outstanding.
    pub fn is_busy(&self) -> bool {
        self.delivered_ticket < self.latest_ticket
    }

    /// 非阻塞取得最新結果，過期結果直接丟棄。 / Non-blocking; stale results are dropped.
    pub fn poll(&mut self) -> Option<RunResult> {
        let mut newest = None;
        while let Ok(result) = self.results.try_recv() {
            if let Some(accepted) = self.accept(result) {
                newest = Some(accepted);
            }
        }
        newest
    }

    /// 阻塞等待最新請求的結果。 / Blocks until the newest request's result arrives.
    pub fn wait(&mut self, timeout: Duration) -> Option<RunResult> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(result) => {
                    if let Some(accepted) = self.accept(result) {
                        return Some(accepted);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    fn accept(&mut self, result: RunResult) -> Option<RunResult> {
        if result.ticket != self.latest_ticket {
            tracing::debug!(
                ticket = result.ticket,
                latest = self.latest_ticket,
                "discarding superseded result"
            );
            return None;
        }
        self.delivered_ticket = result.ticket;
        Some(result)
    }
}

impl PipelineWorker {
    /// 關閉佇列並等待進行中的執行結束。 / Closes the queue and waits for the in-flight run to finish.
    pub fn shutdown(mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("pipeline worker panicked");
            }
        }
    }
}

/// Dropping closes the queue without joining; an in-flight run finishes in
/// the background and its result is discarded.
impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.jobs.take();
        self.handle.take();
    }
}

fn run_loop(pipeline: Pipeline, jobs: Receiver<Job>, results: Sender<RunResult>, notify: Notifier) {
    while let Ok(mut job) = jobs.recv() {
        while let Ok(newer) = jobs.try_recv() {
            tracing::debug!(skipped = job.ticket, next = newer.ticket, "coalescing queued run");
            job = newer;
        }
        let outcome = job.request.execute(&pipeline);
        let result = RunResult {
            ticket: job.ticket,
            request: job.request,
            outcome,
        };
        if results.send(result).is_err() {
            break;
        }
        notify();
    }
}
