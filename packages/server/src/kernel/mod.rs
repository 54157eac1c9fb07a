//! Kernel module - server infrastructure and dependencies.

pub mod crawler_client;
pub mod deps;
pub mod snapshot_client;
pub mod test_dependencies;
pub mod traits;

pub use crawler_client::HttpCrawlerUnit;
pub use deps::ServerDeps;
pub use snapshot_client::{HttpSnapshotStore, NoopSnapshotStore};
pub use test_dependencies::{MemorySnapshotStore, MockCrawlerUnit};
pub use traits::*;
