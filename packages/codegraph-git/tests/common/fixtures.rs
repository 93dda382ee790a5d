//! Scratch git repositories
//!
//! Every `TestRepo` lives in its own temp directory and has a local
//! `user.name` / `user.email` so commits work without global config.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Oid, Repository, Signature};
use tempfile::TempDir;

pub struct TestRepo {
    dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn init() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        configure_identity(&repo);
        Self { dir, repo }
    }

    /// Repository with one committed file, `tracked.txt`
    pub fn with_commit() -> Self {
        let test_repo = Self::init();
        test_repo.write("tracked.txt", "original\n");
        test_repo.commit_all("initial");
        test_repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn path_str(&self, relative: &str) -> String {
        self.join(relative).to_string_lossy().into_owned()
    }

    pub fn write(&self, relative: &str, contents: &str) {
        write_file(self.path(), relative, contents);
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.join(relative)).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.join(relative)).unwrap()
    }

    pub fn commit_all(&self, message: &str) -> Oid {
        commit_all(&self.repo, message)
    }

    /// Short name of the checked-out branch
    pub fn branch(&self) -> String {
        self.repo.head().unwrap().shorthand().unwrap().to_string()
    }

    /// Point `origin/<branch>` at the current HEAD and track it
    pub fn track_origin(&self, url: &str) {
        self.repo.remote("origin", url).unwrap();

        let branch = self.branch();
        let head = self.repo.head().unwrap().target().unwrap();
        self.repo
            .reference(
                &format!("refs/remotes/origin/{}", branch),
                head,
                true,
                "test upstream",
            )
            .unwrap();

        let mut local = self
            .repo
            .find_branch(&branch, git2::BranchType::Local)
            .unwrap();
        local
            .set_upstream(Some(&format!("origin/{}", branch)))
            .unwrap();
    }

    /// Add `source` as a submodule mounted at `mount`, cloned and staged
    pub fn add_submodule(&self, source: &TestRepo, mount: &str) -> Repository {
        let url = source.path().to_string_lossy().into_owned();
        let mut submodule = self
            .repo
            .submodule(&url, Path::new(mount), true)
            .unwrap();
        let sub_repo = submodule.clone(None).unwrap();
        submodule.add_finalize().unwrap();
        configure_identity(&sub_repo);
        sub_repo
    }
}

pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

pub fn commit_all(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.update_all(["*"].iter(), None).unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
}

fn configure_identity(repo: &Repository) {
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();
}
