//! Application - the repository status cache engine

mod options;
mod refresh;
mod repository;

pub use options::OpenOptions;
pub use repository::GitRepository;
