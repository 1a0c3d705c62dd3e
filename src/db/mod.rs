pub mod pool;
pub mod queries;
pub mod settings;
pub mod snapshot_store;

pub use pool::create_pool;
pub use settings::SettingsStore;
pub use snapshot_store::{JsonFileSnapshotStore, MemorySnapshotStore, PgSnapshotStore, SnapshotStore};
