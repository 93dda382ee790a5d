//! Feature modules (vertical slices)

pub mod access_scheduler;
pub mod status_cache;
