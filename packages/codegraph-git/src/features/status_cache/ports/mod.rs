//! Ports - interface to the external VCS backend
//!
//! Every method is a blocking call against a handle that must not be used
//! concurrently. The engine only calls them from work dispatched by the
//! scope's `ResourcePool`.

use std::path::{Path, PathBuf};

use crate::errors::GitResult;
use crate::features::status_cache::domain::{AheadBehind, StatusBits};

/// Status listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    /// Working-directory-relative pathspecs; empty means the whole tree
    pub pathspecs: Vec<String>,

    /// Report untracked files
    pub include_untracked: bool,

    /// Descend into untracked directories instead of reporting the directory
    pub recurse_untracked_dirs: bool,

    /// Treat pathspecs as literal paths (single-path refresh)
    pub exact_match: bool,
}

impl StatusQuery {
    /// Whole-tree (or pathspec-limited) listing
    pub fn tree(pathspecs: Vec<String>) -> Self {
        Self {
            pathspecs,
            include_untracked: true,
            recurse_untracked_dirs: true,
            exact_match: false,
        }
    }

    /// Exactly one path, matched literally
    pub fn single(path: impl Into<String>) -> Self {
        Self {
            pathspecs: vec![path.into()],
            include_untracked: true,
            recurse_untracked_dirs: true,
            exact_match: true,
        }
    }

    pub fn with_untracked(mut self, include: bool, recurse_dirs: bool) -> Self {
        self.include_untracked = include;
        self.recurse_untracked_dirs = recurse_dirs;
        self
    }
}

/// One reported status entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the backend's working directory, `/`-separated
    pub path: String,
    pub status: StatusBits,
}

impl StatusEntry {
    pub fn new(path: impl Into<String>, status: impl Into<StatusBits>) -> Self {
        Self {
            path: path.into(),
            status: status.into(),
        }
    }
}

/// Blocking VCS backend bound to one repository
pub trait RepositoryBackend: Send + 'static {
    /// Working directory, `None` for bare repositories
    fn workdir(&self) -> Option<&Path>;

    fn statuses(&self, query: &StatusQuery) -> GitResult<Vec<StatusEntry>>;

    fn submodule_names(&self) -> GitResult<Vec<String>>;

    /// Submodule mount path relative to this working directory
    fn submodule_path(&self, name: &str) -> GitResult<PathBuf>;

    /// Short name of the checked-out branch; `None` if detached or unborn
    fn head_branch(&self) -> GitResult<Option<String>>;

    /// Counts between a local branch and its upstream; `None` without upstream
    fn ahead_behind(&self, branch: &str) -> GitResult<Option<AheadBehind>>;

    fn is_ignored(&self, path: &str) -> GitResult<bool>;

    /// Config lookup; a missing key is `Ok(None)`
    fn config_string(&self, key: &str) -> GitResult<Option<String>>;

    /// Force-checkout `paths` from HEAD
    fn checkout_head(&mut self, paths: &[String]) -> GitResult<()>;
}

/// Boxed backend handle as stored in the resource pool
pub type BackendHandle = Box<dyn RepositoryBackend>;

/// Opens backend handles for repositories and submodules
pub trait BackendFactory: Send + Sync + 'static {
    /// Open the repository at `path`
    ///
    /// With `exact` the path must be the repository itself; otherwise parent
    /// directories are searched.
    fn open(&self, path: &Path, exact: bool) -> GitResult<BackendHandle>;
}
