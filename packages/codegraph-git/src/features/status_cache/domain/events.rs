//! Change notifications and refresh outcomes

use super::status::StatusBits;

/// Notification broadcast to subscribers of a repository scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// A single-path refresh observed a different status for `path`
    StatusChanged { path: String, status: StatusBits },
    /// A refresh cycle committed a different snapshot (once per cycle)
    StatusesChanged,
    /// The scope was torn down (once)
    Destroyed,
}

impl RepositoryEvent {
    pub fn event_type(&self) -> &str {
        match self {
            RepositoryEvent::StatusChanged { .. } => "status_changed",
            RepositoryEvent::StatusesChanged => "statuses_changed",
            RepositoryEvent::Destroyed => "destroyed",
        }
    }
}

/// Result of one completed refresh link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot identical to the previous one, nothing emitted
    Unchanged,
    /// New snapshot committed and `StatusesChanged` emitted
    Changed,
    /// Scope was destroyed while the link was queued or running
    Abandoned,
}
