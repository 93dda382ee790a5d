//! ResourcePool - exclusive access to a fixed set of exchangeable handles
//!
//! Work items are queued FIFO and each one runs on its own tokio task while
//! holding a [`PoolLease`]. When the work settles (value, error or panic) and
//! its lease is gone, the handle goes back to the tail of the idle list and the
//! next queued item is dispatched.
//!
//! # Example
//! ```ignore
//! let pool = ResourcePool::single(repo);
//! let branch = pool
//!     .enqueue_blocking(|repo| repo.head_branch())
//!     .await??;
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::features::access_scheduler::ports::PoolError;

/// Type-erased queued work: receives a checked-out handle and spawns itself
type Job<H> = Box<dyn FnOnce(H, Arc<PoolShared<H>>) + Send>;

struct PoolState<H> {
    available: VecDeque<H>,
    pending: VecDeque<Job<H>>,
}

struct PoolShared<H> {
    state: Mutex<PoolState<H>>,
    capacity: usize,
}

impl<H: Send + 'static> PoolShared<H> {
    /// Pair idle handles with queued jobs until one side runs out.
    ///
    /// Jobs are invoked outside the lock; a job only spawns a task.
    fn drain(self: &Arc<Self>) {
        loop {
            let (handle, job) = {
                let mut state = self.state.lock();
                if state.available.is_empty() || state.pending.is_empty() {
                    return;
                }
                match (state.available.pop_front(), state.pending.pop_front()) {
                    (Some(handle), Some(job)) => (handle, job),
                    _ => return,
                }
            };

            job(handle, Arc::clone(self));
        }
    }

    fn release(self: &Arc<Self>, handle: H) {
        self.state.lock().available.push_back(handle);
        self.drain();
    }
}

/// Exclusive, checked-out access to one pooled handle
///
/// The handle returns to the pool once the lease is dropped AND the work item
/// that received it has settled, whichever happens last.
pub struct PoolLease<H: Send + 'static> {
    handle: Option<H>,
    return_tx: Option<oneshot::Sender<H>>,
    pool: Arc<PoolShared<H>>,
}

impl<H: Send + 'static> Deref for PoolLease<H> {
    type Target = H;

    fn deref(&self) -> &H {
        // Only `Drop` takes the handle out
        self.handle.as_ref().expect("lease holds its handle until drop")
    }
}

impl<H: Send + 'static> DerefMut for PoolLease<H> {
    fn deref_mut(&mut self) -> &mut H {
        self.handle.as_mut().expect("lease holds its handle until drop")
    }
}

impl<H: Send + 'static> Drop for PoolLease<H> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match self.return_tx.take() {
            Some(tx) => {
                // Dispatch task is gone (runtime shutdown): hand back directly
                if let Err(handle) = tx.send(handle) {
                    self.pool.release(handle);
                }
            }
            None => self.pool.release(handle),
        }
    }
}

impl<H: Send + 'static> fmt::Debug for PoolLease<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolLease").finish_non_exhaustive()
    }
}

/// FIFO scheduler over a fixed set of interchangeable handles
///
/// Cloning is cheap and every clone schedules against the same handles.
pub struct ResourcePool<H: Send + 'static> {
    shared: Arc<PoolShared<H>>,
}

impl<H: Send + 'static> Clone for ResourcePool<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<H: Send + 'static> ResourcePool<H> {
    /// Create a pool over the given handles
    pub fn new(handles: impl IntoIterator<Item = H>) -> Self {
        let available: VecDeque<H> = handles.into_iter().collect();
        let capacity = available.len();

        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    available,
                    pending: VecDeque::new(),
                }),
                capacity,
            }),
        }
    }

    /// Create a pool that fully serializes work against one handle
    pub fn single(handle: H) -> Self {
        Self::new(std::iter::once(handle))
    }

    /// Queue `work` for exclusive execution against one handle
    ///
    /// The item is queued when this method is called, not when the returned
    /// future is first polled. Work never runs inline: it is spawned on the
    /// runtime that was current at the call.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime. A panic inside `work` is
    /// resumed on the task awaiting the returned future.
    pub fn enqueue<T, F, Fut>(&self, work: F) -> impl Future<Output = Result<T, PoolError>> + Send
    where
        F: FnOnce(PoolLease<H>) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = Handle::current();
        let (tx, rx) = oneshot::channel();

        let job: Job<H> = Box::new(move |handle, pool| {
            runtime.spawn(async move {
                let (return_tx, return_rx) = oneshot::channel();
                let lease = PoolLease {
                    handle: Some(handle),
                    return_tx: Some(return_tx),
                    pool: Arc::clone(&pool),
                };

                let outcome = AssertUnwindSafe(work(lease)).catch_unwind().await;

                // Recycle before resolving so the backlog moves first
                if let Ok(handle) = return_rx.await {
                    pool.release(handle);
                }
                let _ = tx.send(outcome);
            });
        });

        self.shared.state.lock().pending.push_back(job);
        self.shared.drain();

        async move {
            match rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(payload)) => panic::resume_unwind(payload),
                Err(_) => Err(PoolError::Canceled),
            }
        }
    }

    /// Run a blocking closure against one handle on tokio's blocking pool
    ///
    /// The lease moves onto the blocking thread, so the handle stays checked
    /// out until `f` returns.
    pub fn enqueue_blocking<T, F>(&self, f: F) -> impl Future<Output = Result<T, PoolError>> + Send
    where
        F: FnOnce(&mut H) -> T + Send + 'static,
        T: Send + 'static,
    {
        let scheduled = self.enqueue(move |mut lease| async move {
            tokio::task::spawn_blocking(move || f(&mut *lease)).await
        });

        async move {
            match scheduled.await? {
                Ok(value) => Ok(value),
                Err(join_err) if join_err.is_panic() => panic::resume_unwind(join_err.into_panic()),
                Err(_) => Err(PoolError::Canceled),
            }
        }
    }

    /// Number of queued items not yet dispatched
    ///
    /// Work that holds a handle and is still executing is not counted.
    pub fn queue_depth(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Number of idle handles
    pub fn available_handles(&self) -> usize {
        self.shared.state.lock().available.len()
    }

    /// Number of handles the pool was built with
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

impl<H: Send + 'static> fmt::Debug for ResourcePool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("capacity", &self.capacity())
            .field("available", &self.available_handles())
            .field("queue_depth", &self.queue_depth())
            .finish()
    }
}
