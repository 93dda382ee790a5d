//! Error types for codegraph-git
//!
//! Every fallible operation returns [`GitResult`]. [`ErrorKind`] gives callers a
//! stable classifier so a torn-down repository can be told apart from a
//! transient backend failure without matching on messages.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::access_scheduler::PoolError;

/// Stable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation attempted on a destroyed repository scope
    Destroyed,
    /// The VCS backend call itself failed
    BackendFailure,
    /// A reported submodule could not be opened
    InvalidSubmodule,
    /// Path does not resolve to a working tree
    NotAWorkingTree,
    /// Scheduled work never settled
    Scheduler,
    /// Configuration errors
    Config,
    /// I/O errors
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Destroyed => "destroyed",
            ErrorKind::BackendFailure => "backend_failure",
            ErrorKind::InvalidSubmodule => "invalid_submodule",
            ErrorKind::NotAWorkingTree => "not_a_working_tree",
            ErrorKind::Scheduler => "scheduler",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for repository status operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository has been destroyed")]
    Destroyed,

    /// Forwarded untouched from libgit2
    #[error(transparent)]
    Backend(#[from] git2::Error),

    #[error("Invalid submodule '{name}': {source}")]
    InvalidSubmodule {
        name: String,
        #[source]
        source: Box<GitError>,
    },

    #[error("Not a working tree: {0}")]
    NotAWorkingTree(PathBuf),

    #[error(transparent)]
    Scheduler(#[from] PoolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GitError::Destroyed => ErrorKind::Destroyed,
            GitError::Backend(_) => ErrorKind::BackendFailure,
            GitError::InvalidSubmodule { .. } => ErrorKind::InvalidSubmodule,
            GitError::NotAWorkingTree(_) => ErrorKind::NotAWorkingTree,
            GitError::Scheduler(_) => ErrorKind::Scheduler,
            GitError::Config(_) => ErrorKind::Config,
            GitError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, GitError::Destroyed)
    }

    /// Create a backend failure from a plain message
    pub fn backend(msg: impl fmt::Display) -> Self {
        GitError::Backend(git2::Error::from_str(&msg.to_string()))
    }

    pub fn invalid_submodule(name: impl Into<String>, source: GitError) -> Self {
        GitError::InvalidSubmodule {
            name: name.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for repository status operations
pub type GitResult<T> = std::result::Result<T, GitError>;
