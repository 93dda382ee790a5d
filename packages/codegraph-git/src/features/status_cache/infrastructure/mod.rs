/// Status Cache Infrastructure
pub mod git2_backend;

pub use git2_backend::{Git2Backend, Git2BackendFactory};
