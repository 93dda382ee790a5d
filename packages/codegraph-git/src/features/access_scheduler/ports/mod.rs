//! Ports - scheduler error surface

use thiserror::Error;

/// Scheduler failures
///
/// Work-item failures are never wrapped here: they are part of the work's own
/// output and reach only the caller that enqueued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The runtime dropped the work before it settled (shutdown)
    #[error("Scheduled work was canceled before it settled")]
    Canceled,
}
