use hive2hive_base::{err, kind_err, Error, Kind};
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// A single-shot, pollable-or-blocking result of an asynchronous DHT
/// operation (top-level spec §4.6: "all asynchronous, returning a future
/// that exposes isSuccess"). Distinct from `hive2hive-async`'s
/// `AsyncWrapper`, which backgrounds a whole `ProcessComponent`: this
/// client is a standalone façade and doesn't depend on the process
/// framework, so it carries its own minimal handle.
pub struct PendingResult<T> {
    rx: Mutex<Option<Receiver<Result<T, Error>>>>,
    done: Mutex<Option<Result<T, Error>>>,
}

impl<T: Clone + Send + 'static> PendingResult<T> {
    pub(crate) fn spawn<F>(work: F) -> Self
    where
        F: FnOnce() -> Result<T, Error> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(work());
        });
        PendingResult {
            rx: Mutex::new(Some(rx)),
            done: Mutex::new(None),
        }
    }

    /// Non-blocking check for completion. Does not distinguish "still
    /// running" from "completed with an error"; use [`PendingResult::wait`]
    /// to retrieve the actual outcome.
    pub fn is_success(&self) -> bool {
        self.poll();
        matches!(*self.done.lock().unwrap(), Some(Ok(_)))
    }

    pub fn is_done(&self) -> bool {
        self.poll();
        self.done.lock().unwrap().is_some()
    }

    /// Blocks until the operation completes, returning its outcome.
    pub fn wait(&self) -> Result<T, Error> {
        self.poll_blocking();
        self.done
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(err("pending result channel closed without a value")))
    }

    /// Blocks until the operation completes or `timeout` elapses, whichever
    /// comes first (top-level spec's "(expansion) Configuration",
    /// `dht_timeout_ms`). A timed-out call leaves the background thread
    /// running to completion; a later `wait`/`wait_timeout` on the same
    /// handle still observes its eventual outcome.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, Error> {
        {
            let done = self.done.lock().unwrap();
            if let Some(result) = done.as_ref() {
                return result.clone();
            }
        }
        let mut rx_guard = self.rx.lock().unwrap();
        let Some(rx) = rx_guard.as_ref() else {
            drop(rx_guard);
            return self
                .done
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(err("pending result channel closed without a value")));
        };
        match rx.recv_timeout(timeout) {
            Ok(result) => {
                *rx_guard = None;
                *self.done.lock().unwrap() = Some(result.clone());
                result
            }
            Err(_) => Err(kind_err(Kind::Other, "dht call timed out")),
        }
    }

    fn poll(&self) {
        let mut done = self.done.lock().unwrap();
        if done.is_some() {
            return;
        }
        let mut rx_guard = self.rx.lock().unwrap();
        if let Some(rx) = rx_guard.as_ref() {
            if let Ok(result) = rx.try_recv() {
                *done = Some(result);
                *rx_guard = None;
            }
        }
    }

    fn poll_blocking(&self) {
        let mut done = self.done.lock().unwrap();
        if done.is_some() {
            return;
        }
        let rx = self.rx.lock().unwrap().take();
        if let Some(rx) = rx {
            *done = Some(
                rx.recv()
                    .unwrap_or_else(|_| Err(err("pending result channel closed without a value"))),
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wait_returns_the_spawned_outcome() {
        let pending = PendingResult::spawn(|| Ok::<_, Error>(42));
        assert_eq!(pending.wait().unwrap(), 42);
        assert!(pending.is_success());
    }

    #[test]
    fn wait_surfaces_a_failure() {
        let pending: PendingResult<i32> = PendingResult::spawn(|| Err(err("boom")));
        assert!(pending.wait().is_err());
        assert!(!pending.is_success());
    }

    #[test]
    fn wait_timeout_returns_the_outcome_within_the_deadline() {
        let pending = PendingResult::spawn(|| Ok::<_, Error>(7));
        assert_eq!(pending.wait_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[test]
    fn wait_timeout_fires_when_the_work_is_slower_than_the_deadline() {
        let pending = PendingResult::spawn(|| {
            thread::sleep(Duration::from_millis(200));
            Ok::<_, Error>(1)
        });
        let err = pending.wait_timeout(Duration::from_millis(10)).unwrap_err();
        assert_eq!(err.kind(), Kind::Other);

        // The background thread is still running to completion; a later
        // call on the same handle observes its eventual outcome.
        assert_eq!(pending.wait().unwrap(), 1);
    }
}
