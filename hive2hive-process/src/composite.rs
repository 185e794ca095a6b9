use crate::component::{ComponentCore, ProcessComponent};
use crate::context::Context;
use crate::lifecycle::State;
use crate::rollback::RollbackReason;
use hive2hive_base::{kind_err, Kind, Result};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

/// Child execution strategy (top-level spec §4.2).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Policy {
    Sequential,
    Concurrent,
}

/// Ordered container of child components (top-level spec §3,
/// "ProcessComposite"). Invariant: a composite's state is `Rollbacking` iff
/// at least one child is rolling back (or already rolled back) because of
/// this composite's own cancel.
pub struct ProcessComposite {
    core: ComponentCore,
    policy: Policy,
    children: Mutex<Vec<Arc<dyn ProcessComponent>>>,
    completed: Mutex<Vec<Arc<dyn ProcessComponent>>>,
}

impl ProcessComposite {
    pub fn new(policy: Policy) -> Arc<Self> {
        Arc::new(ProcessComposite {
            core: ComponentCore::new(),
            policy,
            children: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        })
    }

    /// Appends a child, wiring its parent back-edge. Legal any time the
    /// composite isn't `Rollbacking` -- this is the dynamic pipeline
    /// extension mechanism a step uses to append follow-on steps to its
    /// parent during `do_execute` (top-level spec §4.1/§4.2).
    pub fn push_child(self: &Arc<Self>, child: Arc<dyn ProcessComponent>) -> Result<()> {
        if self.core.state() == State::Rollbacking {
            return Err(kind_err(
                Kind::InvalidState,
                "cannot extend a composite that is rolling back",
            ));
        }
        let weak: Weak<dyn ProcessComponent> = Arc::downgrade(self) as Weak<dyn ProcessComponent>;
        child.core().set_parent(weak);
        self.children.lock().unwrap().push(child);
        Ok(())
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().unwrap().len()
    }

    /// Blocks the running thread while the composite is externally paused,
    /// so "no next child is started" while `Paused` (§5). A composite
    /// cancelled while paused transitions straight to `Failed` via
    /// `ProcessComponent::cancel`; this loop simply stops waiting once the
    /// state is no longer `Paused`.
    fn wait_while_paused(&self) {
        while self.core.state() == State::Paused {
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Re-reads `children` by index rather than cloning the list once, so a
    /// child that appends a follow-on sibling from its own `do_execute`
    /// (dynamic pipeline extension, §4.1) gets run in the same pass instead
    /// of being stranded until some later, separate call.
    fn run_sequential(&self, ctx: &Context) -> Result<()> {
        let mut i = 0;
        loop {
            self.wait_while_paused();
            if self.core.state() != State::Running {
                break;
            }
            let child = match self.children.lock().unwrap().get(i).cloned() {
                Some(child) => child,
                None => break,
            };
            child.start(ctx)?;
            self.completed.lock().unwrap().push(child);
            i += 1;
        }
        Ok(())
    }

    /// Starts every not-yet-started child on its own thread and waits for
    /// all to finish. True preemptive cancellation of in-flight siblings on
    /// first failure isn't modelled here (see DESIGN.md); what is modelled
    /// is the required end state: every child that actually succeeded gets
    /// rolled back, in reverse completion order, if any sibling failed.
    fn run_concurrent(&self, ctx: &Context) -> Result<()> {
        let children = self.children.lock().unwrap().clone();
        let results: Vec<(Arc<dyn ProcessComponent>, Result<()>)> = thread::scope(|scope| {
            let handles: Vec<_> = children
                .iter()
                .map(|child| {
                    let child = Arc::clone(child);
                    scope.spawn(move || {
                        let result = child.start(ctx);
                        (child, result)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut first_err = None;
        for (child, result) in results {
            match result {
                Ok(()) => self.completed.lock().unwrap().push(child),
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl ProcessComponent for ProcessComposite {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn do_execute(&self, ctx: &Context) -> Result<()> {
        match self.policy {
            Policy::Sequential => self.run_sequential(ctx),
            Policy::Concurrent => self.run_concurrent(ctx),
        }
    }

    /// Rolls back every child that actually completed, in reverse
    /// completion order (stable tie-break by insertion order, which is
    /// exactly the order `completed` was appended in), per §5's ordering
    /// guarantee.
    fn do_rollback(&self, ctx: &Context, reason: &RollbackReason) {
        let mut completed = self.completed.lock().unwrap();
        while let Some(child) = completed.pop() {
            let child_reason = RollbackReason::new(reason.hint.clone());
            let _ = child.cancel(ctx, child_reason);
        }
    }
}
