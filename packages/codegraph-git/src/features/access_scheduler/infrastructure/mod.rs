mod resource_pool;
mod serial_queue;

pub use resource_pool::{PoolLease, ResourcePool};
pub use serial_queue::SerialQueue;
