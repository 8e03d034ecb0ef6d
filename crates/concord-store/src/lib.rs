// crates/concord-store/src/lib.rs
//
// concord-store: Storage layer for Concord.
//
// Provides the ordered `KvStore` view the keepers run against, an in-memory
// implementation, a per-message write branch, an optional RocksDB backend,
// and typed parameter storage.

pub mod branch;
pub mod kv;
pub mod memory;
pub mod params;
#[cfg(feature = "rocksdb")]
pub mod rocks;

// Re-export key types for ergonomic access from downstream crates.
pub use branch::BranchStore;
pub use kv::{JsonScan, KvIter, KvPair, KvStore, KvStoreExt};
pub use memory::MemoryStore;
pub use params::ParamStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;
