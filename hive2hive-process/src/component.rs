use crate::context::Context;
use crate::lifecycle::{is_legal_transition, PausedFrom, State};
use crate::listener::{Listener, ListenerId};
use crate::rollback::RollbackReason;
use hive2hive_base::{kind_err, Kind, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ComponentId(pub u64);

impl ComponentId {
    pub fn next() -> Self {
        ComponentId(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct Inner {
    state: State,
    progress: f64,
    paused_from: Option<PausedFrom>,
    parent: Option<Weak<dyn ProcessComponent>>,
    listeners: Vec<(ListenerId, Arc<dyn Listener>)>,
}

/// Shared bookkeeping every `ProcessComponent` embeds: identity, progress,
/// lifecycle state, a non-owning parent back-edge, and listeners
/// (top-level spec §3, "ProcessComponent"). `ProcessComponent`'s default
/// `start`/`pause`/`resume`/`cancel` methods drive this via the template
/// hooks (`do_execute` etc.) each concrete step or composite implements.
pub struct ComponentCore {
    id: ComponentId,
    inner: Mutex<Inner>,
}

impl Default for ComponentCore {
    fn default() -> Self {
        ComponentCore {
            id: ComponentId::next(),
            inner: Mutex::new(Inner {
                state: State::Ready,
                progress: 0.0,
                paused_from: None,
                parent: None,
                listeners: Vec::new(),
            }),
        }
    }
}

impl ComponentCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn state(&self) -> State {
        self.inner.lock().unwrap().state
    }

    pub fn progress(&self) -> f64 {
        self.inner.lock().unwrap().progress
    }

    pub fn set_progress(&self, progress: f64) {
        self.inner.lock().unwrap().progress = progress.clamp(0.0, 1.0);
    }

    pub fn parent(&self) -> Option<Arc<dyn ProcessComponent>> {
        self.inner.lock().unwrap().parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_parent(&self, parent: Weak<dyn ProcessComponent>) {
        self.inner.lock().unwrap().parent = Some(parent);
    }

    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> ListenerId {
        let id = ListenerId::next();
        self.inner.lock().unwrap().listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.inner.lock().unwrap().listeners.retain(|(lid, _)| *lid != id);
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn Listener>> {
        self.inner
            .lock()
            .unwrap()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect()
    }

    fn transition(&self, to: State) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !is_legal_transition(inner.state, to) {
            return Err(kind_err(
                Kind::InvalidState,
                format!("illegal transition {:?} -> {:?}", inner.state, to),
            ));
        }
        inner.state = to;
        Ok(())
    }

    fn notify_succeeded_and_finished(&self) {
        for l in self.listeners_snapshot() {
            l.on_succeeded(self.id.0);
        }
        for l in self.listeners_snapshot() {
            l.on_finished(self.id.0);
        }
    }

    fn notify_failed_and_finished(&self, reason: &RollbackReason) {
        for l in self.listeners_snapshot() {
            l.on_failed(self.id.0, reason);
        }
        for l in self.listeners_snapshot() {
            l.on_finished(self.id.0);
        }
    }
}

/// Leaf or composite execution unit (top-level spec §4.1/§4.2). The default
/// `start`/`pause`/`resume`/`cancel` implementations carry out the
/// state-gated orchestration the spec's table describes; concrete types
/// only need to implement the `do_*` template hooks.
pub trait ProcessComponent: Send + Sync {
    fn core(&self) -> &ComponentCore;

    /// The only synchronous work hook for a leaf. May append follow-on
    /// steps to its parent composite (dynamic pipeline extension, §4.1) via
    /// whatever handle the concrete type holds on its parent.
    fn do_execute(&self, ctx: &Context) -> Result<()>;

    fn do_pause(&self) {}
    fn do_resume_execution(&self) {}
    fn do_resume_rollback(&self) {}
    fn do_rollback(&self, _ctx: &Context, _reason: &RollbackReason) {}

    fn id(&self) -> ComponentId {
        self.core().id()
    }

    fn state(&self) -> State {
        self.core().state()
    }

    fn start(&self, ctx: &Context) -> Result<()> {
        self.core().transition(State::Running)?;
        match self.do_execute(ctx) {
            Ok(()) => {
                self.core().transition(State::Succeeded)?;
                self.core().notify_succeeded_and_finished();
                Ok(())
            }
            Err(e) => {
                let reason = RollbackReason::from_error("doExecute failed", e);
                self.core().transition(State::Rollbacking)?;
                self.do_rollback(ctx, &reason);
                self.core().transition(State::Failed)?;
                self.core().notify_failed_and_finished(&reason);
                Err(reason
                    .cause
                    .unwrap_or_else(|| kind_err(Kind::Other, "step failed")))
            }
        }
    }

    fn pause(&self) -> Result<()> {
        let current = self.core().state();
        let from = match current {
            State::Running => PausedFrom::Running,
            State::Rollbacking => PausedFrom::Rollbacking,
            _ => {
                return Err(kind_err(
                    Kind::InvalidState,
                    "pause is only legal while running or rolling back",
                ))
            }
        };
        self.core().transition(State::Paused)?;
        self.core().inner.lock().unwrap().paused_from = Some(from);
        self.do_pause();
        Ok(())
    }

    fn resume(&self, ctx: &Context) -> Result<()> {
        if self.core().state() != State::Paused {
            return Err(kind_err(Kind::InvalidState, "resume requires Paused"));
        }
        let from = self
            .core()
            .inner
            .lock()
            .unwrap()
            .paused_from
            .take()
            .unwrap_or(PausedFrom::Running);
        match from {
            PausedFrom::Running => {
                self.core().transition(State::Running)?;
                self.do_resume_execution();
            }
            PausedFrom::Rollbacking => {
                self.core().transition(State::Rollbacking)?;
                self.do_resume_rollback();
                let reason = RollbackReason::new("resumed rollback");
                self.core().transition(State::Failed)?;
                self.core().notify_failed_and_finished(&reason);
                return Ok(());
            }
        }
        let _ = ctx;
        Ok(())
    }

    /// Cancel always rolls back from the outermost ancestor so compensating
    /// actions respect composite ordering; idempotence is guaranteed by the
    /// `parent.state == Rollbacking` gate (top-level spec §4.1).
    fn cancel(&self, ctx: &Context, reason: RollbackReason) -> Result<()> {
        if let Some(parent) = self.core().parent() {
            if parent.state() != State::Rollbacking {
                return parent.cancel(ctx, reason);
            }
        }
        match self.core().state() {
            State::Running | State::Paused | State::Succeeded => {}
            _ => {
                return Err(kind_err(
                    Kind::InvalidState,
                    "cancel requires Running, Paused, or Succeeded",
                ))
            }
        }
        self.core().transition(State::Rollbacking)?;
        self.do_rollback(ctx, &reason);
        self.core().transition(State::Failed)?;
        self.core().notify_failed_and_finished(&reason);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct NoOpStep {
        core: ComponentCore,
        fail: bool,
    }

    impl ProcessComponent for NoOpStep {
        fn core(&self) -> &ComponentCore {
            &self.core
        }
        fn do_execute(&self, _ctx: &Context) -> Result<()> {
            if self.fail {
                Err(kind_err(Kind::Other, "boom"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn start_on_success_reaches_succeeded() {
        let step = NoOpStep {
            core: ComponentCore::new(),
            fail: false,
        };
        let ctx = Context::new();
        step.start(&ctx).unwrap();
        assert_eq!(step.state(), State::Succeeded);
    }

    #[test]
    fn start_on_failure_rolls_back_to_failed() {
        let step = NoOpStep {
            core: ComponentCore::new(),
            fail: true,
        };
        let ctx = Context::new();
        assert!(step.start(&ctx).is_err());
        assert_eq!(step.state(), State::Failed);
    }

    #[test]
    fn starting_twice_is_invalid_state() {
        let step = NoOpStep {
            core: ComponentCore::new(),
            fail: false,
        };
        let ctx = Context::new();
        step.start(&ctx).unwrap();
        let err = step.start(&ctx).unwrap_err();
        assert_eq!(err.kind(), Kind::InvalidState);
    }
}
