//! Access Scheduler - serialized access to non-thread-safe backend handles
//!
//! - `ResourcePool`: FIFO work queue over a fixed set of exchangeable handles.
//!   With one handle every work item is fully serialized; more handles widen
//!   parallelism without touching callers.
//! - `SerialQueue`: depth-1 chain of links that must never overlap (refresh
//!   cycles), independent of how many handles the pool owns.
//!
//! Holds no repository knowledge.

pub mod infrastructure;
pub mod ports;

pub use infrastructure::{PoolLease, ResourcePool, SerialQueue};
pub use ports::PoolError;
