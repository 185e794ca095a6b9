use crate::rollback::RollbackReason;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// A handle returned by `add_listener`, usable to detach it later. Detaching
/// mid-notification only takes effect for subsequent terminal events
/// (top-level spec §4.1).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Notified on a component's terminal events. `on_finished` always fires
/// after `on_succeeded`/`on_failed` for the same termination.
pub trait Listener: Send + Sync {
    fn on_succeeded(&self, _component: u64) {}
    fn on_failed(&self, _component: u64, _reason: &RollbackReason) {}
    fn on_finished(&self, _component: u64) {}
}
