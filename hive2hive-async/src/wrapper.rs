use crate::handle::Handle;
use crate::pool::WorkerPool;
use hive2hive_base::Result;
use hive2hive_process::{Context, ProcessComponent, RollbackReason};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Adapts any `ProcessComponent` for background execution (top-level spec
/// §4.3). `start` hands the component to a `WorkerPool` and returns
/// immediately with a `Handle`; the wrapped component's own `ComponentCore`
/// carries the real lifecycle state, observable through `state()`/listeners
/// exactly as if it had been started directly.
///
/// `T` is whatever the wrapped pipeline's context produces; non-result-
/// bearing pipelines use `T = ()` with `extract` returning `Ok(())`
/// unconditionally once the component succeeds.
pub struct AsyncWrapper<T> {
    component: Arc<dyn ProcessComponent>,
    context: Arc<Context>,
    extract: Arc<dyn Fn(&Context) -> T + Send + Sync>,
    picked_up: Arc<AtomicBool>,
    pending_pause: Arc<AtomicBool>,
}

impl<T: Send + 'static> AsyncWrapper<T> {
    pub fn new(
        component: Arc<dyn ProcessComponent>,
        context: Context,
        extract: impl Fn(&Context) -> T + Send + Sync + 'static,
    ) -> Self {
        AsyncWrapper {
            component,
            context: Arc::new(context),
            extract: Arc::new(extract),
            picked_up: Arc::new(AtomicBool::new(false)),
            pending_pause: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Submits the wrapped component to `pool` and returns immediately.
    pub fn start(&self, pool: &WorkerPool) -> Handle<T> {
        let component = Arc::clone(&self.component);
        let context = Arc::clone(&self.context);
        let extract = Arc::clone(&self.extract);
        let picked_up = Arc::clone(&self.picked_up);
        let pending_pause = Arc::clone(&self.pending_pause);
        let (tx, rx) = std::sync::mpsc::channel();

        pool.submit(move || {
            picked_up.store(true, Ordering::SeqCst);
            // A pause requested before pickup is honored here, before the
            // wrapped component ever transitions out of `Ready` (§4.3).
            while pending_pause.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(2));
            }
            let outcome = component.start(&context).map(|()| extract(&context));
            let _ = tx.send(outcome);
        });

        Handle::new(rx)
    }

    /// Forwards to the wrapped component once picked up; before pickup, the
    /// pause is recorded and honored at pickup (§4.3).
    pub fn pause(&self) -> Result<()> {
        if self.picked_up.load(Ordering::SeqCst) {
            self.component.pause()
        } else {
            self.pending_pause.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    pub fn resume(&self) -> Result<()> {
        if self.picked_up.load(Ordering::SeqCst) {
            self.component.resume(&self.context)
        } else {
            self.pending_pause.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Cancellation always forwards to the wrapped component (§4.3).
    pub fn cancel(&self, reason: RollbackReason) -> Result<()> {
        self.component.cancel(&self.context, reason)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hive2hive_base::kind_err;
    use hive2hive_base::Kind;
    use hive2hive_process::{ComponentCore, Permission, State};
    use std::sync::Mutex;

    struct RecordingStep {
        core: ComponentCore,
        fail: bool,
        started: Arc<Mutex<bool>>,
    }

    impl ProcessComponent for RecordingStep {
        fn core(&self) -> &ComponentCore {
            &self.core
        }
        fn do_execute(&self, ctx: &Context) -> Result<()> {
            *self.started.lock().unwrap() = true;
            ctx.set_share_permission(Permission::Read)?;
            if self.fail {
                Err(kind_err(Kind::Other, "boom"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn start_runs_in_the_background_and_the_handle_resolves() {
        let pool = WorkerPool::new(2);
        let started = Arc::new(Mutex::new(false));
        let component = Arc::new(RecordingStep {
            core: ComponentCore::new(),
            fail: false,
            started: Arc::clone(&started),
        });
        let wrapper = AsyncWrapper::new(
            Arc::clone(&component) as Arc<dyn ProcessComponent>,
            Context::new(),
            |ctx| ctx.share_permission(),
        );

        let handle = wrapper.start(&pool);
        let result = handle.wait().unwrap();
        assert_eq!(result, Some(Permission::Read));
        assert!(*started.lock().unwrap());
        assert_eq!(component.state(), State::Succeeded);
    }

    #[test]
    fn failure_surfaces_through_the_handle() {
        let pool = WorkerPool::new(1);
        let component = Arc::new(RecordingStep {
            core: ComponentCore::new(),
            fail: true,
            started: Arc::new(Mutex::new(false)),
        });
        let wrapper = AsyncWrapper::new(
            component as Arc<dyn ProcessComponent>,
            Context::new(),
            |_ctx| (),
        );

        let handle = wrapper.start(&pool);
        assert!(handle.wait().is_err());
    }

    #[test]
    fn pause_before_pickup_is_honored_then_resume_lets_it_run() {
        let pool = WorkerPool::new(1);
        let started = Arc::new(Mutex::new(false));
        let component = Arc::new(RecordingStep {
            core: ComponentCore::new(),
            fail: false,
            started: Arc::clone(&started),
        });
        let wrapper = AsyncWrapper::new(
            component as Arc<dyn ProcessComponent>,
            Context::new(),
            |_ctx| (),
        );

        wrapper.pause().unwrap();
        let handle = wrapper.start(&pool);
        thread::sleep(Duration::from_millis(20));
        assert!(!*started.lock().unwrap());

        wrapper.resume().unwrap();
        handle.wait().unwrap();
        assert!(*started.lock().unwrap());
    }
}
