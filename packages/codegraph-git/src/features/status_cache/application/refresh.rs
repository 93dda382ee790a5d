//! Refresh cycles and single-path refreshes
//!
//! A cycle runs as one link of the scope's `SerialQueue`:
//!
//! 1. status listing for the requested pathspecs
//! 2. branch and ahead/behind (failures fall back to `None` / `{0, 0}`)
//! 3. submodule reconciliation, each child refreshed through its own chain
//! 4. merge of child caches under their mount keys
//! 5. compare and commit under the state lock, one `StatusesChanged` at most
//!
//! Children opened or retired during a cycle are only swapped in at commit, so
//! readers never see a half-merged cache.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use tracing::{debug, info, warn};

use crate::errors::{GitError, GitResult};
use crate::features::status_cache::domain::{
    AheadBehind, RefreshOutcome, RepositoryEvent, StatusBits,
};
use crate::features::status_cache::ports::{RepositoryBackend, StatusQuery};
use crate::shared::join_relative;

use super::options::OpenOptions;
use super::repository::{GitRepository, Route, SubmoduleScope};

impl GitRepository {
    /// Queue one refresh cycle limited to `pathspecs` (whole tree when empty)
    ///
    /// The cycle is queued when this is called, not when the future is
    /// polled. It resolves once its own cycle completed:
    /// - `Ok(Changed)` / `Ok(Unchanged)` after a committed snapshot
    /// - `Ok(Abandoned)` when the scope was destroyed while queued or running
    /// - `Err(Destroyed)` when called on a destroyed scope
    pub fn refresh_status(
        &self,
        pathspecs: Vec<String>,
    ) -> BoxFuture<'static, GitResult<RefreshOutcome>> {
        if self.is_destroyed() {
            return future::ready(Err(GitError::Destroyed)).boxed();
        }

        let pathspecs: Vec<String> = pathspecs
            .iter()
            .map(|spec| self.inner.paths.relative(spec))
            .filter(|spec| !spec.is_empty())
            .collect();

        let this = self.clone();
        let link = self
            .inner
            .refresh_queue
            .push(async move { this.run_refresh(pathspecs).await });

        async move {
            match link.await {
                Ok(result) => result,
                Err(e) => Err(GitError::from(e)),
            }
        }
        .boxed()
    }

    /// Refresh a single path and return its status
    ///
    /// Paths inside a submodule are refreshed by the submodule's scope and
    /// mirrored into every enclosing cache. Each mirror write is queued on
    /// that ancestor's refresh chain, so it lands after any cycle already in
    /// flight there. Emits `StatusChanged` on each scope whose cached value
    /// changed.
    pub async fn path_status(&self, path: &str) -> GitResult<StatusBits> {
        self.ensure_live()?;
        let Route {
            scope,
            relative,
            key,
            ancestors,
        } = self.route(path);

        if key.is_empty() {
            return scope.directory_status("").await;
        }

        let status = scope.refresh_own_path(relative, key.clone()).await?;

        let mut key = key;
        for (ancestor, mount) in ancestors.iter().rev() {
            key = join_relative(mount, &key);
            ancestor.mirror_path(key.clone(), status).await?;
        }
        Ok(status)
    }

    /// Force-checkout `path` from HEAD, then refresh it
    pub async fn checkout_head(&self, path: &str) -> GitResult<StatusBits> {
        self.ensure_live()?;
        let Route { scope, relative, .. } = self.route(path);

        scope
            .with_backend(move |backend| backend.checkout_head(&[relative]))
            .await?;
        self.path_status(path).await
    }

    async fn run_refresh(&self, pathspecs: Vec<String>) -> GitResult<RefreshOutcome> {
        match self.refresh_cycle(pathspecs).await {
            Ok(outcome) => {
                debug!(
                    "Refresh of {} finished: {:?}",
                    self.inner.workdir.display(),
                    outcome
                );
                Ok(outcome)
            }
            Err(e) if self.is_destroyed() => {
                debug!(
                    "Refresh of {} abandoned after teardown: {}",
                    self.inner.workdir.display(),
                    e
                );
                Ok(RefreshOutcome::Abandoned)
            }
            Err(e) => {
                warn!("Refresh of {} failed: {}", self.inner.workdir.display(), e);
                Err(e)
            }
        }
    }

    async fn refresh_cycle(&self, pathspecs: Vec<String>) -> GitResult<RefreshOutcome> {
        if self.is_destroyed() {
            return Ok(RefreshOutcome::Abandoned);
        }

        let inner = Arc::clone(&self.inner);
        let mut merged: HashMap<String, StatusBits> = self
            .with_backend(move |backend| {
                let query = StatusQuery::tree(pathspecs).with_untracked(
                    inner.config.include_untracked,
                    inner.config.recurse_untracked_dirs,
                );
                let mut statuses: HashMap<String, StatusBits> = HashMap::new();
                for entry in backend.statuses(&query)? {
                    if entry.status.is_current() {
                        continue;
                    }
                    *statuses.entry(inner.paths.key(&entry.path)).or_default() |= entry.status;
                }
                Ok(statuses)
            })
            .await?;

        let (branch, ahead_behind) = self
            .with_backend(|backend| Ok(read_branch(backend)))
            .await?;

        let mut submodules = HashMap::new();
        let mut retired = Vec::new();
        if self.inner.config.track_submodules {
            let candidates = self.reconcile_submodules().await?;
            let outcomes = future::join_all(
                candidates
                    .iter()
                    .map(|(_, submodule)| submodule.repository.refresh_status(Vec::new())),
            )
            .await;

            for ((name, submodule), outcome) in candidates.into_iter().zip(outcomes) {
                let child_statuses = match outcome {
                    Ok(RefreshOutcome::Abandoned) => Err(GitError::Destroyed),
                    Ok(_) => submodule.repository.cached_statuses(),
                    Err(e) => Err(e),
                };

                match child_statuses {
                    Ok(child_statuses) => {
                        for (path, status) in child_statuses {
                            *merged
                                .entry(join_relative(&submodule.mount, &path))
                                .or_default() |= status;
                        }
                        submodules.insert(name, submodule);
                    }
                    Err(e) => {
                        if !self.is_destroyed() {
                            warn!("Dropping submodule '{}' after failed refresh: {}", name, e);
                        }
                        retired.push(submodule.repository);
                    }
                }
            }
        }

        let outcome = {
            let mut state = self.inner.state.lock();
            if self.is_destroyed() {
                retired.extend(submodules.into_values().map(|s| s.repository));
                RefreshOutcome::Abandoned
            } else {
                for (name, previous) in state.submodules.drain() {
                    if !submodules.contains_key(&name) {
                        retired.push(previous.repository);
                    }
                }

                let changed = state.statuses != merged
                    || state.branch != branch
                    || state.ahead_behind != ahead_behind;

                state.submodules = submodules;
                state.statuses = merged;
                state.branch = branch;
                state.ahead_behind = ahead_behind;

                if changed {
                    let _ = self.inner.events.send(RepositoryEvent::StatusesChanged);
                    RefreshOutcome::Changed
                } else {
                    RefreshOutcome::Unchanged
                }
            }
        };

        for child in retired {
            child.destroy();
        }
        Ok(outcome)
    }

    /// Child scopes for every reported submodule, opening new ones
    ///
    /// Submodules that cannot be opened are logged and skipped.
    async fn reconcile_submodules(&self) -> GitResult<Vec<(String, SubmoduleScope)>> {
        let listed = self
            .with_backend(|backend| {
                let names = backend.submodule_names()?;
                Ok(names
                    .into_iter()
                    .map(|name| {
                        let path = backend.submodule_path(&name);
                        (name, path)
                    })
                    .collect::<Vec<_>>())
            })
            .await?;

        let existing: HashMap<String, GitRepository> = self
            .inner
            .state
            .lock()
            .submodules
            .iter()
            .map(|(name, submodule)| (name.clone(), submodule.repository.clone()))
            .collect();

        let mut candidates = Vec::with_capacity(listed.len());
        for (name, path) in listed {
            let path = match path {
                Ok(path) => path,
                Err(e) => {
                    warn!("{}", GitError::invalid_submodule(&name, e));
                    continue;
                }
            };

            let mount = self.inner.paths.key(&path.to_string_lossy());
            if mount.is_empty() {
                warn!("Submodule '{}' has no mount path, skipping", name);
                continue;
            }

            let repository = match existing.get(&name) {
                Some(repository) if !repository.is_destroyed() => repository.clone(),
                _ => match self.open_submodule(&name, &path).await {
                    Ok(repository) => repository,
                    Err(e) => {
                        warn!("{}", e);
                        continue;
                    }
                },
            };
            candidates.push((name, SubmoduleScope { mount, repository }));
        }
        Ok(candidates)
    }

    async fn open_submodule(&self, name: &str, relative: &Path) -> GitResult<GitRepository> {
        let options = OpenOptions::new()
            .exact(true)
            .with_config(self.inner.config.clone())
            .with_shared_factory(Arc::clone(&self.inner.factory));

        let child = GitRepository::open(self.inner.workdir.join(relative), options)
            .await
            .map_err(|e| GitError::invalid_submodule(name, e))?;

        info!("Tracking submodule '{}' at {}", name, relative.display());
        Ok(child)
    }

    /// Single-path refresh against this scope's own backend
    ///
    /// `relative` goes to the backend as given; `key` addresses the cache.
    /// The cache entry is updated inside the scheduled work.
    async fn refresh_own_path(&self, relative: String, key: String) -> GitResult<StatusBits> {
        let inner = Arc::clone(&self.inner);
        self.with_backend(move |backend| {
            let query = StatusQuery::single(relative).with_untracked(
                inner.config.include_untracked,
                inner.config.recurse_untracked_dirs,
            );
            let status = backend
                .statuses(&query)?
                .into_iter()
                .filter(|entry| inner.paths.key(&entry.path) == key)
                .fold(StatusBits::CURRENT, |acc, entry| acc | entry.status);

            inner.record_path(&key, status);
            Ok(status)
        })
        .await
    }

    /// Record a descendant's single-path result behind this scope's refresh chain
    async fn mirror_path(&self, key: String, status: StatusBits) -> GitResult<()> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .refresh_queue
            .push(async move {
                inner.record_path(&key, status);
            })
            .await?;
        Ok(())
    }
}

fn read_branch(backend: &mut dyn RepositoryBackend) -> (Option<String>, AheadBehind) {
    let branch = backend.head_branch().unwrap_or_else(|e| {
        warn!("Could not resolve HEAD branch: {}", e);
        None
    });

    let ahead_behind = match &branch {
        Some(name) => backend
            .ahead_behind(name)
            .unwrap_or_else(|e| {
                debug!("No ahead/behind for '{}': {}", name, e);
                None
            })
            .unwrap_or_default(),
        None => AheadBehind::default(),
    };

    (branch, ahead_behind)
}
