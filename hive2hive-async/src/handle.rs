use hive2hive_base::Result;
use std::sync::mpsc::Receiver;
use std::sync::Mutex;

/// A single-shot handle to a background `AsyncWrapper` job's outcome
/// (top-level spec §4.3, "result handles"). `wait` blocks until terminal
/// state; `poll` never blocks.
pub struct Handle<T> {
    rx: Mutex<Option<Receiver<Result<T>>>>,
    done: Mutex<Option<Result<T>>>,
}

impl<T> Handle<T> {
    pub(crate) fn new(rx: Receiver<Result<T>>) -> Self {
        Handle {
            rx: Mutex::new(Some(rx)),
            done: Mutex::new(None),
        }
    }

    /// Blocks the caller until the wrapped component reaches a terminal
    /// state, then returns its outcome -- `Err` surfaces the rollback
    /// reason's causal error, per §4.3.
    pub fn wait(&self) -> Result<T>
    where
        T: Clone,
    {
        self.resolve();
        self.done.lock().unwrap().clone().expect("resolved above")
    }

    pub fn is_done(&self) -> bool {
        if self.done.lock().unwrap().is_some() {
            return true;
        }
        let mut rx_slot = self.rx.lock().unwrap();
        if let Some(rx) = rx_slot.as_ref() {
            if let Ok(outcome) = rx.try_recv() {
                *self.done.lock().unwrap() = Some(outcome);
                *rx_slot = None;
                return true;
            }
        }
        false
    }

    fn resolve(&self) {
        if self.done.lock().unwrap().is_some() {
            return;
        }
        let rx = self.rx.lock().unwrap().take();
        if let Some(rx) = rx {
            let outcome = rx.recv().expect("worker dropped the result sender");
            *self.done.lock().unwrap() = Some(outcome);
        }
    }
}

impl<T: Clone> Handle<T> {
    pub fn poll(&self) -> Option<Result<T>> {
        if self.is_done() {
            self.done.lock().unwrap().clone()
        } else {
            None
        }
    }
}
