//! Per-key single-flight gate.
//!
//! The first caller for a key spawns the work; everyone arriving while it runs
//! waits on the same `watch` channel and receives a clone of its result. The
//! lock only guards the in-flight map and is never held across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

type Inflight<T> = Arc<Mutex<HashMap<String, watch::Receiver<Option<T>>>>>;

pub struct SingleFlight<T> {
    inflight: Inflight<T>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self { inflight: Arc::new(Mutex::new(HashMap::new())) }
    }
}

/// Reopens the gate for `key` when the work finishes or unwinds.
struct Release<T> {
    inflight: Inflight<T>,
    key: String,
}

impl<T> Drop for Release<T> {
    fn drop(&mut self) {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.key);
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Run `work` for `key` unless a run is already in flight, then wait for
    /// whichever run owns the key.
    ///
    /// The work is spawned, so a caller that goes away doesn't abandon the
    /// others. Returns `None` only if the work panicked.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let rx = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match inflight.get(key) {
                Some(rx) => rx.clone(),
                None => {
                    let (tx, rx) = watch::channel(None);
                    inflight.insert(key.to_string(), rx.clone());

                    let release = Release { inflight: Arc::clone(&self.inflight), key: key.to_string() };
                    let fut = work();
                    tokio::spawn(async move {
                        let result = fut.await;
                        drop(release);
                        tx.send_replace(Some(result));
                    });
                    rx
                }
            }
        };
        wait(rx).await
    }

    /// Number of keys with work in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

async fn wait<T: Clone>(mut rx: watch::Receiver<Option<T>>) -> Option<T> {
    match rx.wait_for(Option::is_some).await {
        Ok(result) => result.clone(),
        Err(_) => None,
    }
}
