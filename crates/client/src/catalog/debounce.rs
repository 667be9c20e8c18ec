//! Search-box debounce.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

type Commit = Arc<dyn Fn(String) + Send + Sync>;

/// Commits a value once input has been quiet for `window`.
///
/// Every call to [`input`](Self::input) cancels the pending commit and starts
/// a new timer, so at most one commit is ever pending. Timers run on the
/// caller's tokio runtime, or on the runtime that was current when the
/// debouncer was built. With neither, input commits immediately.
pub struct SearchDebouncer {
    window: Duration,
    commit: Commit,
    runtime: Option<Handle>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchDebouncer {
    pub fn new(window: Duration, commit: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self {
            window,
            commit: Arc::new(commit),
            runtime: Handle::try_current().ok(),
            pending: Mutex::new(None),
        }
    }

    /// Record a keystroke's worth of input.
    pub fn input(&self, value: impl Into<String>) {
        let value = value.into();
        let commit = Arc::clone(&self.commit);
        let window = self.window;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            drop(pending);
            debug!(search = %value, "no tokio runtime, search committed without delay");
            commit(value);
            return;
        };
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            debug!(search = %value, "search committed");
            commit(value);
        }));
    }

    /// Drop the pending commit, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            previous.abort();
        }
    }

    /// Whether a commit is still waiting for quiescence.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
