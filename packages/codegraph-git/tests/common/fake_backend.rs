//! In-memory backend
//!
//! A `FakeWorld` maps repository paths to their reported state. Tests mutate
//! the world between refreshes; every handle opened from it sees the change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use codegraph_git::{
    AheadBehind, BackendFactory, BackendHandle, GitError, GitResult, RepositoryBackend,
    StatusBits, StatusEntry, StatusQuery,
};
use parking_lot::{Condvar, Mutex};

pub const FAKE_ROOT: &str = "/fake/root";

#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub statuses: HashMap<String, StatusBits>,
    /// name -> mount path relative to this repository
    pub submodules: Vec<(String, String)>,
    pub branch: Option<String>,
    pub ahead_behind: Option<AheadBehind>,
    pub config: HashMap<String, String>,
    pub ignored: Vec<String>,
    pub fail_statuses: bool,
    /// Status calls on this repository skip the world's gate
    pub ungated: bool,
}

impl FakeRepo {
    pub fn with_status(mut self, path: &str, status: git2::Status) -> Self {
        self.statuses.insert(path.to_string(), status.into());
        self
    }

    pub fn with_submodule(mut self, name: &str, mount: &str) -> Self {
        self.submodules.push((name.to_string(), mount.to_string()));
        self
    }

    pub fn with_branch(mut self, branch: &str, ahead_behind: Option<AheadBehind>) -> Self {
        self.branch = Some(branch.to_string());
        self.ahead_behind = ahead_behind;
        self
    }

    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.config.insert(key.to_string(), value.to_string());
        self
    }
}

/// Blocks backend status calls while closed
#[derive(Default)]
pub struct Gate {
    closed: Mutex<bool>,
    cv: Condvar,
    entered: AtomicUsize,
}

impl Gate {
    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    pub fn open(&self) {
        *self.closed.lock() = false;
        self.cv.notify_all();
    }

    /// Calls that reached the gate so far
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    fn pass(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let mut closed = self.closed.lock();
        while *closed {
            self.cv.wait(&mut closed);
        }
    }
}

#[derive(Default)]
pub struct FakeWorld {
    repos: Mutex<HashMap<PathBuf, FakeRepo>>,
    pub gate: Gate,
    opens: AtomicUsize,
}

impl FakeWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn root() -> PathBuf {
        PathBuf::from(FAKE_ROOT)
    }

    pub fn insert(&self, path: impl Into<PathBuf>, repo: FakeRepo) {
        self.repos.lock().insert(path.into(), repo);
    }

    pub fn remove(&self, path: &Path) {
        self.repos.lock().remove(path);
    }

    /// Mutate the repository at `path` in place
    pub fn update(&self, path: &Path, f: impl FnOnce(&mut FakeRepo)) {
        let mut repos = self.repos.lock();
        let repo = repos.get_mut(path).expect("fake repository exists");
        f(repo);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn snapshot(&self, path: &Path) -> GitResult<FakeRepo> {
        self.repos
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| GitError::backend(format!("repository vanished: {}", path.display())))
    }
}

#[derive(Clone)]
pub struct FakeBackendFactory {
    pub world: Arc<FakeWorld>,
}

impl FakeBackendFactory {
    pub fn new(world: &Arc<FakeWorld>) -> Self {
        Self {
            world: Arc::clone(world),
        }
    }
}

impl BackendFactory for FakeBackendFactory {
    fn open(&self, path: &Path, _exact: bool) -> GitResult<BackendHandle> {
        if !self.world.repos.lock().contains_key(path) {
            return Err(GitError::backend(format!(
                "could not find repository at '{}'",
                path.display()
            )));
        }
        self.world.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBackend {
            path: path.to_path_buf(),
            world: Arc::clone(&self.world),
        }))
    }
}

pub struct FakeBackend {
    path: PathBuf,
    world: Arc<FakeWorld>,
}

impl RepositoryBackend for FakeBackend {
    fn workdir(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn statuses(&self, query: &StatusQuery) -> GitResult<Vec<StatusEntry>> {
        if !self.world.snapshot(&self.path)?.ungated {
            self.world.gate.pass();
        }
        let repo = self.world.snapshot(&self.path)?;
        if repo.fail_statuses {
            return Err(GitError::backend("status listing failed"));
        }

        let matches = |path: &str| -> bool {
            query.pathspecs.is_empty()
                || query.pathspecs.iter().any(|spec| {
                    path == spec || (!query.exact_match && path.starts_with(&format!("{}/", spec)))
                })
        };

        let mut entries: Vec<StatusEntry> = repo
            .statuses
            .iter()
            .filter(|(path, _)| matches(path.as_str()))
            .map(|(path, status)| StatusEntry::new(path.clone(), *status))
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn submodule_names(&self) -> GitResult<Vec<String>> {
        let repo = self.world.snapshot(&self.path)?;
        Ok(repo.submodules.into_iter().map(|(name, _)| name).collect())
    }

    fn submodule_path(&self, name: &str) -> GitResult<PathBuf> {
        let repo = self.world.snapshot(&self.path)?;
        repo.submodules
            .into_iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, mount)| PathBuf::from(mount))
            .ok_or_else(|| GitError::backend(format!("no submodule named '{}'", name)))
    }

    fn head_branch(&self) -> GitResult<Option<String>> {
        Ok(self.world.snapshot(&self.path)?.branch)
    }

    fn ahead_behind(&self, _branch: &str) -> GitResult<Option<AheadBehind>> {
        Ok(self.world.snapshot(&self.path)?.ahead_behind)
    }

    fn is_ignored(&self, path: &str) -> GitResult<bool> {
        let repo = self.world.snapshot(&self.path)?;
        Ok(repo.ignored.iter().any(|ignored| ignored == path))
    }

    fn config_string(&self, key: &str) -> GitResult<Option<String>> {
        Ok(self.world.snapshot(&self.path)?.config.get(key).cloned())
    }

    fn checkout_head(&mut self, paths: &[String]) -> GitResult<()> {
        let mut repos = self.world.repos.lock();
        let repo = repos
            .get_mut(&self.path)
            .ok_or_else(|| GitError::backend("repository vanished"))?;
        for path in paths {
            repo.statuses.remove(path);
        }
        Ok(())
    }
}
