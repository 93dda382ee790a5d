//! GitRepository - status cache scope for one working tree
//!
//! A scope owns its backend handles (through a `ResourcePool`), the merged
//! status map and the child scopes of its submodules. Clones share one scope.

use std::collections::HashMap;
use std::fmt;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::config::StatusCacheConfig;
use crate::errors::{GitError, GitResult};
use crate::features::access_scheduler::{PoolError, ResourcePool, SerialQueue};
use crate::features::status_cache::domain::{AheadBehind, RepositoryEvent, StatusBits};
use crate::features::status_cache::infrastructure::Git2BackendFactory;
use crate::features::status_cache::ports::{
    BackendFactory, BackendHandle, RepositoryBackend, StatusQuery,
};
use crate::shared::{strip_mount, PathNormalizer};

use super::options::OpenOptions;

/// Child scope of a submodule, mounted at a parent-relative key
#[derive(Clone)]
pub(super) struct SubmoduleScope {
    pub(super) mount: String,
    pub(super) repository: GitRepository,
}

#[derive(Default)]
pub(super) struct ScopeState {
    /// Merged statuses of this scope and its submodules; current paths absent
    pub(super) statuses: HashMap<String, StatusBits>,
    pub(super) branch: Option<String>,
    pub(super) ahead_behind: AheadBehind,
    pub(super) submodules: HashMap<String, SubmoduleScope>,
}

pub(super) struct RepositoryInner {
    pub(super) identity: PathBuf,
    pub(super) workdir: PathBuf,
    pub(super) config: StatusCacheConfig,
    pub(super) factory: Arc<dyn BackendFactory>,
    pub(super) paths: PathNormalizer,
    /// `None` once destroyed
    pub(super) pool: Mutex<Option<ResourcePool<BackendHandle>>>,
    pub(super) state: Mutex<ScopeState>,
    pub(super) refresh_queue: SerialQueue,
    pub(super) events: broadcast::Sender<RepositoryEvent>,
    pub(super) destroyed: AtomicBool,
}

impl RepositoryInner {
    pub(super) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Store one path's status and emit `StatusChanged` if it differs
    pub(super) fn record_path(&self, key: &str, status: StatusBits) -> bool {
        let mut state = self.state.lock();
        if self.is_destroyed() {
            return false;
        }

        let previous = state
            .statuses
            .get(key)
            .copied()
            .unwrap_or(StatusBits::CURRENT);
        if previous == status {
            return false;
        }

        if status.is_current() {
            state.statuses.remove(key);
        } else {
            state.statuses.insert(key.to_string(), status);
        }
        let _ = self.events.send(RepositoryEvent::StatusChanged {
            path: key.to_string(),
            status,
        });
        true
    }
}

/// Scope owning a path, plus the scopes walked through to reach it
pub(super) struct Route {
    pub(super) scope: GitRepository,
    /// Path relative to `scope` in the caller's case, for the backend
    pub(super) relative: String,
    /// Cache key relative to `scope`
    pub(super) key: String,
    /// Each ancestor with the mount of the next scope down, outermost first
    pub(super) ancestors: Vec<(GitRepository, String)>,
}

/// Submodule-aware status cache over one working tree
///
/// # Example
/// ```ignore
/// let repo = GitRepository::open("/work/project", OpenOptions::new()).await?;
/// let mut events = repo.subscribe();
/// repo.refresh_status(vec![]).await?;
/// if repo.is_path_modified("src/lib.rs").await? { /* ... */ }
/// ```
#[derive(Clone)]
pub struct GitRepository {
    pub(super) inner: Arc<RepositoryInner>,
}

impl GitRepository {
    /// Open a scope and its backend handles
    ///
    /// Submodules are not opened here; the first refresh discovers them.
    pub async fn open(path: impl AsRef<Path>, options: OpenOptions) -> GitResult<Self> {
        let OpenOptions {
            open_exact_path,
            config,
            factory,
        } = options;
        config.validate()?;

        let identity = path.as_ref().to_path_buf();
        let factory =
            factory.unwrap_or_else(|| Arc::new(Git2BackendFactory) as Arc<dyn BackendFactory>);

        let opened = {
            let factory = Arc::clone(&factory);
            let identity = identity.clone();
            let pool_size = config.pool_size;
            tokio::task::spawn_blocking(move || {
                open_handles(&*factory, &identity, open_exact_path, pool_size)
            })
            .await
        };
        let (handles, workdir, ignorecase) = settle_blocking(opened)??;

        let case_insensitive = config.case_insensitive.or(ignorecase).unwrap_or(false);
        let (events, _) = broadcast::channel(config.event_capacity);

        info!(
            "Opened repository scope at {} ({} handle(s), case-insensitive: {})",
            workdir.display(),
            handles.len(),
            case_insensitive
        );

        Ok(Self {
            inner: Arc::new(RepositoryInner {
                paths: PathNormalizer::new(&workdir, case_insensitive),
                identity,
                workdir,
                config,
                factory,
                pool: Mutex::new(Some(ResourcePool::new(handles))),
                state: Mutex::new(ScopeState::default()),
                refresh_queue: SerialQueue::new(),
                events,
                destroyed: AtomicBool::new(false),
            }),
        })
    }

    /// Path the scope was opened against
    pub fn path(&self) -> &Path {
        &self.inner.identity
    }

    pub fn working_directory(&self) -> &Path {
        &self.inner.workdir
    }

    pub fn config(&self) -> &StatusCacheConfig {
        &self.inner.config
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.inner.events.subscribe()
    }

    /// Backend work queued behind busy handles
    pub fn queue_depth(&self) -> usize {
        self.inner
            .pool
            .lock()
            .as_ref()
            .map_or(0, ResourcePool::queue_depth)
    }

    /// Cache key for `path` (absolute or working-directory-relative)
    pub fn relativize(&self, path: &str) -> String {
        self.inner.paths.relativize(path)
    }

    /// Cached status from the last refresh; `None` means current
    pub fn cached_status(&self, path: &str) -> GitResult<Option<StatusBits>> {
        self.ensure_live()?;
        let key = self.relativize(path);
        Ok(self.inner.state.lock().statuses.get(&key).copied())
    }

    /// Snapshot of the whole merged cache
    pub fn cached_statuses(&self) -> GitResult<HashMap<String, StatusBits>> {
        self.ensure_live()?;
        Ok(self.inner.state.lock().statuses.clone())
    }

    /// Union of every status under `dir`, submodule contents included
    pub async fn directory_status(&self, dir: &str) -> GitResult<StatusBits> {
        self.ensure_live()?;
        let Route {
            scope,
            relative,
            key,
            ..
        } = self.route(dir);

        let (include, recurse) = (
            scope.inner.config.include_untracked,
            scope.inner.config.recurse_untracked_dirs,
        );
        let spec = relative;
        let mut status = scope
            .with_backend(move |backend| {
                let pathspecs = if spec.is_empty() { Vec::new() } else { vec![spec] };
                let query = StatusQuery::tree(pathspecs).with_untracked(include, recurse);
                Ok(backend
                    .statuses(&query)?
                    .into_iter()
                    .fold(StatusBits::CURRENT, |acc, entry| acc | entry.status))
            })
            .await?;

        // Submodule contents are only known through the merged cache
        {
            let state = scope.inner.state.lock();
            for submodule in state.submodules.values() {
                if strip_mount(&key, &submodule.mount).is_none() {
                    continue;
                }
                for (path, bits) in &state.statuses {
                    if strip_mount(&submodule.mount, path).is_some_and(|inner| !inner.is_empty()) {
                        status |= *bits;
                    }
                }
            }
        }
        Ok(status)
    }

    pub async fn is_path_modified(&self, path: &str) -> GitResult<bool> {
        Ok(self.path_status(path).await?.is_modified())
    }

    pub async fn is_path_new(&self, path: &str) -> GitResult<bool> {
        Ok(self.path_status(path).await?.is_new())
    }

    pub async fn is_path_staged(&self, path: &str) -> GitResult<bool> {
        Ok(self.path_status(path).await?.is_staged())
    }

    pub async fn is_path_deleted(&self, path: &str) -> GitResult<bool> {
        Ok(self.path_status(path).await?.is_deleted())
    }

    pub async fn is_path_ignored(&self, path: &str) -> GitResult<bool> {
        self.ensure_live()?;
        let Route { scope, relative, .. } = self.route(path);
        scope
            .with_backend(move |backend| backend.is_ignored(&relative))
            .await
    }

    /// Cached branch of the scope owning `path` (this scope when `None`)
    pub fn branch_name(&self, path: Option<&str>) -> GitResult<Option<String>> {
        self.ensure_live()?;
        let scope = self.scope_for(path);
        let branch = scope.inner.state.lock().branch.clone();
        Ok(branch)
    }

    pub fn cached_ahead_behind(&self, path: Option<&str>) -> GitResult<AheadBehind> {
        self.ensure_live()?;
        let scope = self.scope_for(path);
        let counts = scope.inner.state.lock().ahead_behind;
        Ok(counts)
    }

    /// Config lookup in the scope owning `path`; a missing key is `None`
    pub async fn config_value(&self, key: &str, path: Option<&str>) -> GitResult<Option<String>> {
        self.ensure_live()?;
        let key = key.to_string();
        self.scope_for(path)
            .with_backend(move |backend| backend.config_string(&key))
            .await
    }

    pub async fn origin_url(&self, path: Option<&str>) -> GitResult<Option<String>> {
        self.config_value("remote.origin.url", path).await
    }

    /// Whether `path` is the mount point of a tracked submodule
    pub fn is_submodule(&self, path: &str) -> GitResult<bool> {
        self.ensure_live()?;
        let Route { scope, key, .. } = self.route(path);
        if key.is_empty() {
            return Ok(false);
        }
        let state = scope.inner.state.lock();
        Ok(state.submodules.values().any(|s| s.mount == key))
    }

    /// Direct child scope by submodule name
    pub fn submodule(&self, name: &str) -> GitResult<Option<GitRepository>> {
        self.ensure_live()?;
        let state = self.inner.state.lock();
        Ok(state.submodules.get(name).map(|s| s.repository.clone()))
    }

    pub fn submodule_names(&self) -> GitResult<Vec<String>> {
        self.ensure_live()?;
        let mut names: Vec<String> = self.inner.state.lock().submodules.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Tear the scope down
    ///
    /// Idempotent. Releases the backend handles, destroys submodule scopes and
    /// clears every cache; `Destroyed` is emitted once. Work already queued
    /// settles with [`GitError::Destroyed`].
    pub fn destroy(&self) {
        let (children, pool) = {
            let mut state = self.inner.state.lock();
            if self.inner.destroyed.swap(true, Ordering::SeqCst) {
                return;
            }

            let children: Vec<GitRepository> = state
                .submodules
                .drain()
                .map(|(_, submodule)| submodule.repository)
                .collect();
            state.statuses.clear();
            state.branch = None;
            state.ahead_behind = AheadBehind::default();

            let _ = self.inner.events.send(RepositoryEvent::Destroyed);
            (children, self.inner.pool.lock().take())
        };

        for child in children {
            child.destroy();
        }
        drop(pool);
        info!("Destroyed repository scope at {}", self.inner.workdir.display());
    }

    pub(super) fn ensure_live(&self) -> GitResult<()> {
        if self.is_destroyed() {
            Err(GitError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Walk submodule mounts down to the scope that owns `path`
    pub(super) fn route(&self, path: &str) -> Route {
        let mut scope = self.clone();
        let mut relative = self.inner.paths.relative(path);
        let mut key = self.inner.paths.fold(&relative);
        let mut ancestors = Vec::new();

        loop {
            let next = {
                let state = scope.inner.state.lock();
                state.submodules.values().find_map(|submodule| {
                    strip_mount(&submodule.mount, &key)
                        .filter(|inner| !inner.is_empty() && !submodule.mount.is_empty())
                        .map(|_| submodule.clone())
                })
            };

            match next {
                Some(submodule) => {
                    let child = submodule.repository.clone();
                    let depth = submodule.mount.split('/').count();
                    let inner = relative.splitn(depth + 1, '/').nth(depth).unwrap_or("");
                    relative = child.inner.paths.relative(inner);
                    key = child.inner.paths.fold(&relative);
                    ancestors.push((scope, submodule.mount));
                    scope = child;
                }
                None => break,
            }
        }

        Route {
            scope,
            relative,
            key,
            ancestors,
        }
    }

    fn scope_for(&self, path: Option<&str>) -> GitRepository {
        match path {
            Some(path) => self.route(path).scope,
            None => self.clone(),
        }
    }

    /// Run blocking backend work on one of this scope's handles
    pub(super) async fn with_backend<T, F>(&self, work: F) -> GitResult<T>
    where
        F: FnOnce(&mut dyn RepositoryBackend) -> GitResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.inner.pool.lock().clone().ok_or(GitError::Destroyed)?;
        let inner = Arc::clone(&self.inner);

        pool.enqueue_blocking(move |backend: &mut BackendHandle| {
            if inner.is_destroyed() {
                return Err(GitError::Destroyed);
            }
            work(&mut **backend)
        })
        .await?
    }
}

impl fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRepository")
            .field("path", &self.inner.identity)
            .field("workdir", &self.inner.workdir)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

type OpenedHandles = (Vec<BackendHandle>, PathBuf, Option<bool>);

fn open_handles(
    factory: &dyn BackendFactory,
    path: &Path,
    exact: bool,
    pool_size: usize,
) -> GitResult<OpenedHandles> {
    let mut handles = Vec::with_capacity(pool_size);
    for _ in 0..pool_size.max(1) {
        handles.push(factory.open(path, exact)?);
    }

    let first = handles
        .first()
        .ok_or_else(|| GitError::NotAWorkingTree(path.to_path_buf()))?;
    let workdir = first
        .workdir()
        .map(Path::to_path_buf)
        .ok_or_else(|| GitError::NotAWorkingTree(path.to_path_buf()))?;

    let ignorecase = match first.config_string("core.ignorecase") {
        Ok(value) => value.as_deref().map(parse_git_bool),
        Err(e) => {
            debug!("core.ignorecase unreadable for {}: {}", path.display(), e);
            None
        }
    };

    Ok((handles, workdir, ignorecase))
}

fn parse_git_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}

/// Unwrap a blocking task result, resuming panics on the caller
fn settle_blocking<T>(result: Result<T, JoinError>) -> GitResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(join_err) if join_err.is_panic() => panic::resume_unwind(join_err.into_panic()),
        Err(_) => Err(PoolError::Canceled.into()),
    }
}
