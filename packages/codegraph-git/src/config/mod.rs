//! Status cache configuration
//!
//! Defaults fully serialize backend access (one handle per repository) and
//! track untracked files and submodules. Files use a versioned YAML schema:
//!
//! ```yaml
//! version: 1
//! status_cache:
//!   pool_size: 1
//!   track_submodules: true
//!   event_capacity: 256
//! ```

pub mod error;
pub mod io;

pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigFileV1, SUPPORTED_VERSIONS};

use serde::{Deserialize, Serialize};

/// Upper bound on backend handles per repository scope
pub const MAX_POOL_SIZE: usize = 16;

/// Upper bound on buffered events per subscriber
pub const MAX_EVENT_CAPACITY: usize = 65_536;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusCacheConfig {
    /// Backend handles opened per repository scope
    pub pool_size: usize,

    /// Report untracked files during refresh
    pub include_untracked: bool,

    /// Report files inside untracked directories individually
    pub recurse_untracked_dirs: bool,

    /// Discover and merge submodules during refresh
    pub track_submodules: bool,

    /// Force case-insensitive path keys; `None` reads `core.ignorecase`
    pub case_insensitive: Option<bool>,

    /// Broadcast buffer per subscriber; slow subscribers lag past this
    pub event_capacity: usize,
}

impl Default for StatusCacheConfig {
    fn default() -> Self {
        Self {
            pool_size: 1,
            include_untracked: true,
            recurse_untracked_dirs: true,
            track_submodules: true,
            case_insensitive: None,
            event_capacity: 256,
        }
    }
}

impl StatusCacheConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = Some(case_insensitive);
        self
    }

    pub fn with_submodules(mut self, track: bool) -> Self {
        self.track_submodules = track;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_POOL_SIZE).contains(&self.pool_size) {
            return Err(ConfigError::range_with_hint(
                "pool_size",
                self.pool_size,
                1,
                MAX_POOL_SIZE,
                "Use 1 to fully serialize backend access.",
            ));
        }
        if !(1..=MAX_EVENT_CAPACITY).contains(&self.event_capacity) {
            return Err(ConfigError::range_with_hint(
                "event_capacity",
                self.event_capacity,
                1,
                MAX_EVENT_CAPACITY,
                "Refresh cycles emit at most one event each; 256 is plenty.",
            ));
        }
        Ok(())
    }
}
