//! Status Cache - submodule-aware working tree status
//!
//! Hexagonal layout:
//! - `domain`: status bitmask, ahead/behind counts, events
//! - `ports`: `RepositoryBackend` / `BackendFactory` traits
//! - `infrastructure`: libgit2 adapter
//! - `application`: `GitRepository`, the cache engine

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{GitRepository, OpenOptions};
pub use domain::{AheadBehind, RefreshOutcome, RepositoryEvent, StatusBits};
pub use infrastructure::{Git2Backend, Git2BackendFactory};
pub use ports::{BackendFactory, BackendHandle, RepositoryBackend, StatusEntry, StatusQuery};
