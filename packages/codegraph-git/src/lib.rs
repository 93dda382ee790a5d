/*
 * Codegraph Git - working tree status cache
 *
 * Feature-First Hexagonal Architecture:
 * - features/access_scheduler : FIFO resource pool + serial refresh chain
 * - features/status_cache     : status engine (domain / ports / infrastructure / application)
 * - config/                   : StatusCacheConfig + versioned YAML
 * - shared/                   : path keys
 *
 * Concurrency:
 * - One libgit2 handle per pool slot, never shared
 * - Blocking backend calls on tokio's blocking pool
 */

#![allow(clippy::module_inception)]
#![allow(clippy::new_without_default)]

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration (StatusCacheConfig, YAML loading)
pub mod config;

/// Error types
pub mod errors;

/// Feature modules
pub mod features;

/// Shared utilities
pub mod shared;

pub use config::{ConfigError, ConfigResult, StatusCacheConfig};
pub use errors::{ErrorKind, GitError, GitResult};
pub use features::access_scheduler::{PoolError, PoolLease, ResourcePool, SerialQueue};
pub use features::status_cache::{
    AheadBehind, BackendFactory, BackendHandle, Git2Backend, Git2BackendFactory, GitRepository,
    OpenOptions, RefreshOutcome, RepositoryBackend, RepositoryEvent, StatusBits, StatusEntry,
    StatusQuery,
};
