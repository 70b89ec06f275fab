//! nmsync-core: Inventory synchronization and caching engine
//!
//! Selects device groups and devices from the monitoring service, renames
//! their fields into the inventory vocabulary, groups them into a
//! [`Snapshot`], and reuses cached snapshots while the configured filters
//! are unchanged.

pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod populate;
pub mod resolver;
pub mod snapshot;
pub mod sync;

pub use cache::{
    CacheEntry, CacheManager, CacheOutcome, CacheSettings, CacheState, CacheStore, FileCache,
    MemoryCache, cache_key,
};
pub use config::{Settings, SyncConfig};
pub use error::{CacheError, ConfigError, SyncError};
pub use filter::{GroupSelector, HostSelector, PatternSet};
pub use normalize::{DisabledPolicy, FieldMapping, FieldNormalizer, NormalizedDevice};
pub use populate::{InventorySink, JsonInventory, PopulateSummary, Populator};
pub use resolver::DeviceResolver;
pub use snapshot::{Fingerprint, GroupInventory, Snapshot, SnapshotBuilder};
pub use sync::Synchronizer;
