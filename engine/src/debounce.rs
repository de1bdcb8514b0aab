//! Per-key debounce with stale-completion suppression.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use djalint_types::CancelToken;

/// Quiescence window before a scheduled task runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

struct Scheduled {
    generation: u64,
    cancel: CancelToken,
    // None between registration and spawn of the real task.
    handle: Option<tokio::task::JoinHandle<()>>,
}

struct Inner {
    delay: Duration,
    entries: Mutex<HashMap<String, Scheduled>>,
}

impl Inner {
    fn is_current(&self, key: &str, generation: u64) -> bool {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .get(key)
                    .is_some_and(|entry| entry.generation == generation)
            })
            .unwrap_or(false)
    }
}

/// Coalesces bursts of work per key: only the last task scheduled within
/// the quiescence window runs, with a fresh [`CancelToken`] each time.
///
/// Rescheduling a key cancels the prior token and aborts the prior task,
/// and the generation check after the sleep keeps a stale task from
/// running even if the abort raced. Together that gives at most one live
/// result per key.
#[derive(Clone)]
pub struct DebounceScheduler {
    inner: Arc<Inner>,
}

impl DebounceScheduler {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Schedule `task` to run after the quiescence window, superseding
    /// any task already pending for `key`.
    pub fn schedule<F, Fut>(&self, key: &str, task: F)
    where
        F: FnOnce(CancelToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancelToken::new();
        let generation = self.supersede(key, cancel.clone());

        let inner = Arc::clone(&self.inner);
        let task_key = key.to_string();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            if task_cancel.is_cancelled() || !inner.is_current(&task_key, generation) {
                return;
            }
            task(task_cancel).await;
        });

        if let Ok(mut entries) = self.inner.entries.lock()
            && let Some(entry) = entries.get_mut(key)
            && entry.generation == generation
        {
            entry.handle = Some(handle);
        }
    }

    /// Cancel whatever is pending or running for `key`.
    pub fn cancel(&self, key: &str) {
        if let Ok(mut entries) = self.inner.entries.lock()
            && let Some(entry) = entries.remove(key)
        {
            entry.cancel.cancel();
            if let Some(handle) = entry.handle {
                handle.abort();
            }
        }
    }

    /// Register a new generation for `key`, cancelling the previous one.
    /// Returns the new generation number.
    fn supersede(&self, key: &str, cancel: CancelToken) -> u64 {
        let mut entries = self.inner.entries.lock().unwrap_or_else(|e| e.into_inner());
        let generation = entries.get(key).map_or(0, |entry| entry.generation + 1);
        if let Some(previous) = entries.insert(
            key.to_string(),
            Scheduled {
                generation,
                cancel,
                handle: None,
            },
        ) {
            previous.cancel.cancel();
            if let Some(handle) = previous.handle {
                handle.abort();
            }
        }
        generation
    }
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle() {
        // Paused-clock tests auto-advance through the sleep; yield a few
        // times so spawned tasks get polled to completion.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_the_last_task() {
        let scheduler = DebounceScheduler::default();
        let runs = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=5_usize {
            let runs = Arc::clone(&runs);
            let last = Arc::clone(&last);
            scheduler.schedule("file:///a.py", move |_cancel| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
        }
        settle().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_run_independently() {
        let scheduler = DebounceScheduler::default();
        let runs = Arc::new(AtomicUsize::new(0));
        for key in ["a", "b", "c"] {
            let runs = Arc::clone(&runs);
            scheduler.schedule(key, move |_cancel| async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_pending_task() {
        let scheduler = DebounceScheduler::default();
        let runs = Arc::new(AtomicUsize::new(0));
        {
            let runs = Arc::clone(&runs);
            scheduler.schedule("a", move |_cancel| async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        scheduler.cancel("a");
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_task_sees_a_cancelled_token() {
        let scheduler = DebounceScheduler::new(Duration::from_millis(10));
        let first_token: Arc<Mutex<Option<CancelToken>>> = Arc::new(Mutex::new(None));
        {
            let slot = Arc::clone(&first_token);
            scheduler.schedule("a", move |cancel| async move {
                *slot.lock().unwrap() = Some(cancel);
            });
        }
        scheduler.schedule("a", |_cancel| async {});
        settle().await;

        // Whether or not the first closure ran, its token was cancelled
        // at supersede time, so any write it attempted would be refused.
        if let Some(token) = first_token.lock().unwrap().as_ref() {
            assert!(token.is_cancelled());
        }
    }
}
