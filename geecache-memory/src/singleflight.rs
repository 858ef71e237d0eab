use std::future::Future;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::sync::watch;

use geecache_common::Error;

/// Deduplicates concurrent calls for the same key so that N overlapping
/// callers produce exactly one underlying invocation and all observe
/// its result.
///
/// Built on a `tokio::sync::watch` channel rather than a bare
/// `Notify`: a fresh subscriber always sees
/// the most recent value on first read, so a follower that starts
/// waiting after the leader has already finished still gets the
/// result instead of racing a lost wakeup.
pub struct Coalescer<T> {
    in_flight: Mutex<HashMap<String, watch::Receiver<Option<Result<T, Error>>>>>,
}

enum Role<T> {
    Leader(watch::Sender<Option<Result<T, Error>>>),
    Follower(watch::Receiver<Option<Result<T, Error>>>),
}

impl<T: Clone> Coalescer<T> {
    pub fn new() -> Self {
        Coalescer {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` at most once per overlapping burst of calls for `key`.
    pub async fn do_call<F, Fut>(&self, key: &str, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        // The lookup and the leader's insert must happen under the same
        // lock hold: releasing the lock between them would let two
        // overlapping callers both observe no entry and both become
        // leaders for the same key.
        let role = {
            let mut guard = self.in_flight.lock();
            match guard.get(key) {
                Some(rx) => Role::Follower(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    guard.insert(key.to_string(), rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Follower(mut rx) => loop {
                if let Some(result) = rx.borrow().clone() {
                    return result;
                }
                if rx.changed().await.is_err() {
                    // Sender dropped without ever sending: the leader
                    // panicked mid-flight. Treat as a peer-style
                    // transient failure rather than panicking here too.
                    return Err(Error::Peer(format!(
                        "single-flight leader for {key} vanished"
                    )));
                }
            },
            Role::Leader(tx) => {
                let result = f().await;
                let _ = tx.send(Some(result.clone()));
                self.in_flight.lock().remove(key);
                result
            }
        }
    }
}

impl<T: Clone> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test_log::test(tokio::test)]
    async fn sequential_calls_each_invoke_fn() {
        let coalescer = Coalescer::<i32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let result = coalescer
                .do_call("k", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Error>(1)
                })
                .await;
            assert_eq!(result.unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    // Multi-threaded on purpose: a single-threaded runtime can only ever
    // run one `do_call` poll at a time, which can't reproduce the
    // release-then-reacquire race between the lookup and the insert.
    #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn concurrent_calls_coalesce_to_one_invocation() {
        let coalescer = Arc::new(Coalescer::<String>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let coalescer = coalescer.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coalescer
                    .do_call("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, Error>("v".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "v");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn map_does_not_accumulate_completed_keys() {
        let coalescer = Coalescer::<i32>::new();
        let _ = coalescer.do_call("k", || async { Ok::<_, Error>(1) }).await;
        assert!(coalescer.in_flight.lock().is_empty());
    }

    #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
    async fn error_outcomes_are_shared() {
        let coalescer = Arc::new(Coalescer::<i32>::new());
        let mut handles = Vec::new();
        for _ in 0..10 {
            let coalescer = coalescer.clone();
            handles.push(tokio::spawn(async move {
                coalescer
                    .do_call("k", || async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err::<i32, _>(Error::KeyRequired)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_err());
        }
    }
}
