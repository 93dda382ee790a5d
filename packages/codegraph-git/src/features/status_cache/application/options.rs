//! Repository open options

use std::fmt;
use std::sync::Arc;

use crate::config::StatusCacheConfig;
use crate::features::status_cache::ports::BackendFactory;

#[derive(Clone, Default)]
pub struct OpenOptions {
    /// Open exactly the given path instead of searching parent directories
    pub open_exact_path: bool,

    pub config: StatusCacheConfig,

    /// Backend used for this scope and every submodule under it;
    /// `None` opens libgit2 repositories
    pub factory: Option<Arc<dyn BackendFactory>>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(mut self, open_exact_path: bool) -> Self {
        self.open_exact_path = open_exact_path;
        self
    }

    pub fn with_config(mut self, config: StatusCacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_factory(mut self, factory: impl BackendFactory) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn with_shared_factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.factory = Some(factory);
        self
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("open_exact_path", &self.open_exact_path)
            .field("config", &self.config)
            .field("custom_factory", &self.factory.is_some())
            .finish()
    }
}
