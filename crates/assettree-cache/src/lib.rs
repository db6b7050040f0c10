//! # AssetTree Cache
//!
//! Fixed-capacity key/value cache for the asset tree view. The rendering
//! layer uses it for derived lookups (search matches, row measurements) and
//! the performance monitor reads its hit rate.
//!
//! ## Features
//!
//! - **LRU eviction**: a new key at capacity evicts the least recently used entry
//! - **Accounting**: hits, misses and evictions exposed through [`CacheStats`]
//! - **Generic**: any hashable key and any value type

pub mod error;
pub mod lru_cache;
pub mod metrics;

pub use error::{CacheError, Result};
pub use lru_cache::{CacheEntry, LruCache};
pub use metrics::CacheStats;
