//! Background execution adapter for the process framework (top-level spec
//! §4.3): a fixed-size [`WorkerPool`] and an [`AsyncWrapper`] that submits a
//! `ProcessComponent` to it, returning a [`Handle`] the caller can poll or
//! block on.

mod handle;
mod pool;
mod wrapper;

pub use handle::Handle;
pub use pool::WorkerPool;
pub use wrapper::AsyncWrapper;
