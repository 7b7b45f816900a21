use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Spawn a Tokio task with a stable name when supported, and trace span otherwise.
pub fn spawn_named_task<F, S>(name: S, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
    S: Into<String>,
{
    let name_owned = name.into();
    #[cfg(tokio_unstable)]
    {
        tokio::task::Builder::new()
            .name(&name_owned)
            .spawn(future)
            .expect("failed to spawn named task")
    }
    #[cfg(not(tokio_unstable))]
    {
        let span = tracing::info_span!("task", task_name = %name_owned);
        tokio::spawn(future.instrument(span))
    }
}

/// Spawn onto a tracker so the caller can observe when the work drains.
/// Tracked tasks are short-lived effects and get a trace-level span.
pub fn spawn_tracked<F>(tracker: &TaskTracker, name: &'static str, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let span = tracing::trace_span!("effect", effect = name);
    tracker.spawn(future.instrument(span))
}
