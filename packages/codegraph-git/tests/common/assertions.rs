//! Event assertions

use codegraph_git::RepositoryEvent;
use tokio::sync::broadcast::Receiver;

/// Everything buffered on `rx` right now
pub fn drain_events(rx: &mut Receiver<RepositoryEvent>) -> Vec<RepositoryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn assert_no_events(rx: &mut Receiver<RepositoryEvent>) {
    let events = drain_events(rx);
    assert!(events.is_empty(), "unexpected events: {:?}", events);
}

/// Number of `StatusChanged` events for `path` among `events`
pub fn status_changes_for(events: &[RepositoryEvent], path: &str) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, RepositoryEvent::StatusChanged { path: p, .. } if p == path))
        .count()
}

pub fn statuses_changed_count(events: &[RepositoryEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, RepositoryEvent::StatusesChanged))
        .count()
}
