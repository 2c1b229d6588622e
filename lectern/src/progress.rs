// lectern/src/progress.rs
// Foreground side of the progress channel: poll the latest progress text on
// a fixed short interval and feed a spinner, throttling redraw to the poll
// cadence rather than every workload update.
use std::time::Duration;

use indicatif::ProgressBar;
use lectern_core::shell::{WorkloadHandle, WorkloadOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const TICK_INTERVAL: Duration = Duration::from_millis(80);

pub async fn watch<T>(handle: WorkloadHandle<T>) -> WorkloadOutcome<T> {
    let mut rx = handle.progress();
    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(TICK_INTERVAL);

    let mut join = std::pin::pin!(handle.join());
    let outcome = loop {
        tokio::select! {
            outcome = &mut join => break outcome,
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if rx.has_changed().unwrap_or(false) {
                    let text = rx.borrow_and_update().clone();
                    if !text.is_empty() {
                        spinner.set_message(text);
                    }
                }
            }
        }
    };
    spinner.finish_and_clear();
    outcome
}
