// lectern-core/src/shell.rs
// The execution shell: runs a scan or install workload off the foreground
// control path, relays progress text through a single-slot latest-value-wins
// channel, and delivers the result exactly once. If no async runtime is
// available the workload runs inline (blocking) and still funnels through
// the same completion path.
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lectern_common::error::{LecternError, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

// One workload at a time. Advisory: a second launch while one is active is
// rejected rather than queued, which also keeps the snapshot file
// single-writer.
static WORKLOAD_ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, PartialEq, Eq)]
pub enum WorkloadOutcome<T> {
    Completed(T),
    Cancelled,
}

/// Sending half of the progress channel, handed to the workload. Each `set`
/// overwrites the previous text; the foreground polls the latest value.
#[derive(Clone)]
pub struct ProgressSender {
    tx: Arc<watch::Sender<String>>,
}

impl ProgressSender {
    /// A sender with no attached reader, for tests and non-interactive
    /// callers.
    pub fn detached() -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, text: impl Into<String>) {
        self.tx.send_replace(text.into());
    }

    pub fn clear(&self) {
        self.tx.send_replace(String::new());
    }
}

/// Clonable cancellation grip, usable while the handle is parked in `join`.
#[derive(Clone)]
pub struct Canceller {
    cancelled: Arc<AtomicBool>,
    abort: Option<tokio::task::AbortHandle>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

enum Execution<T> {
    Background(JoinHandle<T>),
    /// Background execution was unavailable; the workload already ran inline
    /// and its value waits here for the single delivery path.
    Inline(Option<T>),
}

pub struct WorkloadHandle<T> {
    progress: watch::Receiver<String>,
    progress_tx: ProgressSender,
    cancelled: Arc<AtomicBool>,
    execution: Execution<T>,
    _guard: ActiveGuard,
}

struct ActiveGuard;

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        WORKLOAD_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Launches a workload. Rejects a second launch while one is active.
pub fn spawn<F, Fut, T>(workload: F) -> Result<WorkloadHandle<T>>
where
    F: FnOnce(ProgressSender) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    if WORKLOAD_ACTIVE
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(LecternError::WorkloadActive);
    }
    let guard = ActiveGuard;

    let (tx, rx) = watch::channel(String::new());
    let progress_tx = ProgressSender { tx: Arc::new(tx) };
    let cancelled = Arc::new(AtomicBool::new(false));
    let future = workload(progress_tx.clone());

    let execution = match tokio::runtime::Handle::try_current() {
        Ok(handle) => Execution::Background(handle.spawn(future)),
        Err(_) => {
            debug!("No async runtime available; running workload inline");
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Execution::Inline(Some(runtime.block_on(future)))
        }
    };

    Ok(WorkloadHandle {
        progress: rx,
        progress_tx,
        cancelled,
        execution,
        _guard: guard,
    })
}

impl<T> WorkloadHandle<T> {
    /// A fresh receiver on the progress channel, for the foreground poller.
    pub fn progress(&self) -> watch::Receiver<String> {
        self.progress.clone()
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            cancelled: Arc::clone(&self.cancelled),
            abort: match &self.execution {
                Execution::Background(handle) => Some(handle.abort_handle()),
                Execution::Inline(_) => None,
            },
        }
    }

    /// Waits for the workload and delivers its outcome. Consuming `self`
    /// makes the delivery happen exactly once; the progress channel is
    /// cleared on the way out.
    pub async fn join(self) -> WorkloadOutcome<T> {
        let outcome = match self.execution {
            Execution::Background(handle) => match handle.await {
                Ok(value) => {
                    if self.cancelled.load(Ordering::SeqCst) {
                        WorkloadOutcome::Cancelled
                    } else {
                        WorkloadOutcome::Completed(value)
                    }
                }
                Err(e) if e.is_cancelled() => WorkloadOutcome::Cancelled,
                Err(e) => std::panic::resume_unwind(e.into_panic()),
            },
            Execution::Inline(value) => {
                // Deliver slightly deferred so a pending foreground refresh
                // is not skipped.
                tokio::task::yield_now().await;
                match value {
                    Some(value) if !self.cancelled.load(Ordering::SeqCst) => {
                        WorkloadOutcome::Completed(value)
                    }
                    _ => WorkloadOutcome::Cancelled,
                }
            }
        };
        self.progress_tx.clear();
        outcome
    }

    /// Blocking variant of `join` for callers without a runtime (the inline
    /// fallback path).
    pub fn join_blocking(self) -> WorkloadOutcome<T> {
        let outcome = match self.execution {
            Execution::Background(handle) => match futures::executor::block_on(handle) {
                Ok(value) => {
                    if self.cancelled.load(Ordering::SeqCst) {
                        WorkloadOutcome::Cancelled
                    } else {
                        WorkloadOutcome::Completed(value)
                    }
                }
                Err(e) if e.is_cancelled() => WorkloadOutcome::Cancelled,
                Err(e) => std::panic::resume_unwind(e.into_panic()),
            },
            Execution::Inline(value) => match value {
                Some(value) if !self.cancelled.load(Ordering::SeqCst) => {
                    WorkloadOutcome::Completed(value)
                }
                _ => WorkloadOutcome::Cancelled,
            },
        };
        self.progress_tx.clear();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    // The active-workload flag is process-global; serialize the tests that
    // exercise it.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn completes_and_releases_the_slot() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let handle = spawn(|progress| async move {
            progress.set("working");
            21 * 2
        })
        .unwrap();
        let rx = handle.progress();

        match handle.join().await {
            WorkloadOutcome::Completed(value) => assert_eq!(value, 42),
            WorkloadOutcome::Cancelled => panic!("workload was not cancelled"),
        }
        // Channel cleared at workload end.
        assert_eq!(rx.borrow().as_str(), "");

        // Slot is free again.
        let again = spawn(|_progress| async move { 1 }).unwrap();
        again.join().await;
    }

    #[tokio::test]
    async fn second_launch_is_rejected_while_running() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let handle = spawn(|_progress| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            1
        })
        .unwrap();

        match spawn(|_progress| async move { 2 }) {
            Err(LecternError::WorkloadActive) => {}
            Err(e) => panic!("expected WorkloadActive, got {e}"),
            Ok(_) => panic!("second launch must be rejected"),
        }
        handle.join().await;
    }

    #[tokio::test]
    async fn cancellation_discards_the_result() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let handle = spawn(|progress| async move {
            progress.set("long haul");
            tokio::time::sleep(Duration::from_secs(30)).await;
            1
        })
        .unwrap();
        let canceller = handle.canceller();
        canceller.cancel();

        assert_eq!(handle.join().await, WorkloadOutcome::<i32>::Cancelled);
    }

    #[test]
    fn inline_fallback_runs_synchronously() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let handle = spawn(|progress| async move {
            progress.set("inline");
            7
        })
        .unwrap();
        assert_eq!(handle.join_blocking(), WorkloadOutcome::Completed(7));
    }

    #[tokio::test]
    async fn progress_channel_keeps_latest_value() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = spawn(|progress| async move {
            progress.set("one");
            progress.set("two");
            let _ = started_tx.send(());
            let _ = release_rx.await;
        })
        .unwrap();

        let rx = handle.progress();
        let _ = started_rx.await;
        assert_eq!(rx.borrow().as_str(), "two");
        let _ = release_tx.send(());
        handle.join().await;
    }
}
