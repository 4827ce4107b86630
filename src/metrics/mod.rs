//! Resource sampling framework.
//!
//! Each resource polls its own snapshot source on its own interval, derives
//! metrics from the readings and emits them to a shared sink. The
//! [`Collector`] starts and stops them together.

pub mod collector;
pub mod cpu;
pub mod data;
pub mod disk;
pub mod memory;
pub mod procfs;
pub mod resource;
pub mod source;
pub mod window;

// Re-export commonly used items
pub use collector::{take_snapshot, Collector};
pub use data::HostSnapshot;
pub use resource::{Resource, ResourceHandle};
pub use source::SnapshotSource;
