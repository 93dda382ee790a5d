//! Domain - status bitmask, ahead/behind counts, events

mod events;
mod status;

pub use events::{RefreshOutcome, RepositoryEvent};
pub use status::{AheadBehind, StatusBits};
