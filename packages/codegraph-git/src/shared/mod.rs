//! Shared utilities

pub mod path_utils;

pub use path_utils::{join_relative, strip_mount, PathNormalizer};
