//! Working-directory-relative path keys
//!
//! Cache keys are `/`-separated, have no leading or trailing separator, and
//! are lower-cased when the working tree lives on a case-insensitive
//! filesystem. Absolute paths outside the tree keep their leading `/`.

use std::path::Path;

/// Converts caller paths into cache keys for one working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathNormalizer {
    workdir: String,
    /// Canonical (symlink-resolved) workdir when it differs
    canonical_workdir: Option<String>,
    case_insensitive: bool,
}

impl PathNormalizer {
    pub fn new(workdir: &Path, case_insensitive: bool) -> Self {
        let plain = to_slash(&workdir.to_string_lossy());
        let canonical = workdir
            .canonicalize()
            .ok()
            .map(|p| to_slash(&p.to_string_lossy()))
            .filter(|c| *c != plain);

        Self {
            workdir: plain.trim_end_matches('/').to_string(),
            canonical_workdir: canonical.map(|c| c.trim_end_matches('/').to_string()),
            case_insensitive,
        }
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Relativize `path` against the working directory into a cache key
    ///
    /// Relative input is taken as already relative. Absolute paths outside
    /// the working directory come back absolute, so they never collide with
    /// a key inside the tree.
    pub fn relativize(&self, path: &str) -> String {
        self.fold(&self.relative(path))
    }

    /// Like [`relativize`](Self::relativize) but keeps the caller's case,
    /// for handing paths to the backend
    pub fn relative(&self, path: &str) -> String {
        let path = to_slash(path);

        let stripped = std::iter::once(self.workdir.as_str())
            .chain(self.canonical_workdir.as_deref())
            .find_map(|root| self.strip_root(root, &path));

        match stripped {
            Some(rest) => trim(rest),
            None if is_absolute(&path) => path.trim_end_matches('/').to_string(),
            None => trim(&path),
        }
    }

    /// Normalize an already-relative path into a cache key
    pub fn key(&self, relative: &str) -> String {
        self.fold(&trim(&to_slash(relative)))
    }

    /// Case-fold a relative path into its cache key form
    pub fn fold(&self, relative: &str) -> String {
        if self.case_insensitive {
            relative.to_lowercase()
        } else {
            relative.to_string()
        }
    }

    fn strip_root<'a>(&self, root: &str, path: &'a str) -> Option<&'a str> {
        if root.is_empty() {
            return None;
        }
        let head = path.get(..root.len())?;
        let rest = &path[root.len()..];
        let same_root = if self.case_insensitive {
            head.eq_ignore_ascii_case(root)
        } else {
            head == root
        };
        if !same_root {
            return None;
        }
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest.trim_start_matches('/'))
        } else {
            None
        }
    }
}

/// Join a mount prefix and a key relative to that mount
pub fn join_relative(prefix: &str, inner: &str) -> String {
    match (prefix.is_empty(), inner.is_empty()) {
        (true, _) => inner.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{}/{}", prefix, inner),
    }
}

/// Strip a mount prefix from a key; `Some("")` when the key is the mount itself
pub fn strip_mount<'a>(mount: &str, key: &'a str) -> Option<&'a str> {
    if mount.is_empty() {
        return Some(key);
    }
    let rest = key.strip_prefix(mount)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || Path::new(path).is_absolute()
}

fn trim(path: &str) -> String {
    path.trim_start_matches("./").trim_matches('/').to_string()
}
