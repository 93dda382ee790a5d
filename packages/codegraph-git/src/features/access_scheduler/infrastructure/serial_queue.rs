//! SerialQueue - depth-1 chain of non-overlapping links
//!
//! Each `push` appends a link behind the current tail at call time and spawns
//! it. A link starts only after its predecessor settled, whether it returned,
//! failed or panicked.

use std::fmt;
use std::future::Future;
use std::panic;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::features::access_scheduler::ports::PoolError;

type Settled = Shared<BoxFuture<'static, ()>>;

#[derive(Default)]
pub struct SerialQueue {
    tail: Mutex<Option<Settled>>,
}

impl SerialQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `link` to the chain and return a future for its own output
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn push<T, Fut>(&self, link: Fut) -> BoxFuture<'static, Result<T, PoolError>>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = Handle::current();
        let (settled_tx, settled_rx) = oneshot::channel::<()>();
        let settled: BoxFuture<'static, ()> = async move {
            let _ = settled_rx.await;
        }
        .boxed();

        let previous = self.tail.lock().replace(settled.shared());

        // `settled_tx` is dropped when the task finishes or unwinds
        let task = runtime.spawn(async move {
            if let Some(previous) = previous {
                previous.await;
            }
            let output = link.await;
            drop(settled_tx);
            output
        });

        async move {
            match task.await {
                Ok(output) => Ok(output),
                Err(join_err) if join_err.is_panic() => panic::resume_unwind(join_err.into_panic()),
                Err(_) => Err(PoolError::Canceled),
            }
        }
        .boxed()
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue").finish_non_exhaustive()
    }
}
