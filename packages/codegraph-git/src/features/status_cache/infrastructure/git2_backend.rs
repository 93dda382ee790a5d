//! libgit2 adapter for the `RepositoryBackend` port
//!
//! `git2::Repository` is `Send` but not `Sync`, which is exactly the handle
//! shape the resource pool is built for.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode, Repository, RepositoryOpenFlags, StatusOptions};
use tracing::debug;

use crate::errors::{GitError, GitResult};
use crate::features::status_cache::domain::AheadBehind;
use crate::features::status_cache::ports::{
    BackendFactory, BackendHandle, RepositoryBackend, StatusEntry, StatusQuery,
};

/// Backend over one open libgit2 repository
pub struct Git2Backend {
    repo: Repository,
}

impl Git2Backend {
    /// Open the repository at `path`, searching parents unless `exact`
    pub fn open(path: impl AsRef<Path>, exact: bool) -> GitResult<Self> {
        let path = path.as_ref();
        let repo = if exact {
            Repository::open_ext(path, RepositoryOpenFlags::NO_SEARCH, std::iter::empty::<&OsStr>())?
        } else {
            Repository::discover(path)?
        };

        if repo.is_bare() || repo.workdir().is_none() {
            return Err(GitError::NotAWorkingTree(path.to_path_buf()));
        }

        debug!(
            "Opened git repository at {} (workdir: {:?})",
            path.display(),
            repo.workdir()
        );
        Ok(Self { repo })
    }

    pub fn from_repository(repo: Repository) -> GitResult<Self> {
        match repo.workdir() {
            Some(_) => Ok(Self { repo }),
            None => Err(GitError::NotAWorkingTree(repo.path().to_path_buf())),
        }
    }
}

impl RepositoryBackend for Git2Backend {
    fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    fn statuses(&self, query: &StatusQuery) -> GitResult<Vec<StatusEntry>> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(query.include_untracked)
            .recurse_untracked_dirs(query.include_untracked && query.recurse_untracked_dirs)
            .include_ignored(false)
            .disable_pathspec_match(query.exact_match);
        for spec in &query.pathspecs {
            options.pathspec(spec);
        }

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .filter_map(|entry| {
                entry
                    .path()
                    .map(|path| StatusEntry::new(path, entry.status()))
            })
            .collect())
    }

    fn submodule_names(&self) -> GitResult<Vec<String>> {
        Ok(self
            .repo
            .submodules()?
            .iter()
            .filter_map(|submodule| submodule.name().map(str::to_owned))
            .collect())
    }

    fn submodule_path(&self, name: &str) -> GitResult<PathBuf> {
        Ok(self.repo.find_submodule(name)?.path().to_path_buf())
    }

    fn head_branch(&self) -> GitResult<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(str::to_owned))
    }

    fn ahead_behind(&self, branch: &str) -> GitResult<Option<AheadBehind>> {
        let local = self.repo.find_branch(branch, BranchType::Local)?;
        let upstream = match local.upstream() {
            Ok(upstream) => upstream,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (Some(local_oid), Some(upstream_oid)) = (local.get().target(), upstream.get().target())
        else {
            return Ok(None);
        };

        let (ahead, behind) = self.repo.graph_ahead_behind(local_oid, upstream_oid)?;
        Ok(Some(AheadBehind::new(ahead, behind)))
    }

    fn is_ignored(&self, path: &str) -> GitResult<bool> {
        Ok(self.repo.is_path_ignored(path)?)
    }

    fn config_string(&self, key: &str) -> GitResult<Option<String>> {
        let config = self.repo.config()?;
        match config.get_string(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn checkout_head(&mut self, paths: &[String]) -> GitResult<()> {
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        for path in paths {
            checkout.path(literal_pathspec(path));
        }
        self.repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    }
}

/// Escape pathspec metacharacters so libgit2 matches `path` literally
fn literal_pathspec(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Factory producing [`Git2Backend`] handles
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2BackendFactory;

impl BackendFactory for Git2BackendFactory {
    fn open(&self, path: &Path, exact: bool) -> GitResult<BackendHandle> {
        Ok(Box::new(Git2Backend::open(path, exact)?))
    }
}
