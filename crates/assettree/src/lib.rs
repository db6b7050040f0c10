//! Asset tree state core
//!
//! Composition root tying the workspace crates together:
//! - [`AssetTreeConfig`]: file + environment configuration
//! - [`AssetTreeServices`]: explicit bootstrap and shutdown of every service
//! - [`TreeStateSession`]: the live store with debounced autosave
//!
//! The building blocks are re-exported under their crate names.

pub mod config;
pub mod services;
pub mod session;

pub use config::{AssetTreeConfig, ConfigError, ConfigFormat, StorageBackend, StorageSettings};
pub use services::{AssetTreeServices, ServiceError};
pub use session::TreeStateSession;

pub use assettree_cache as cache;
pub use assettree_common as common;
pub use assettree_performance as performance;
pub use assettree_persistence as persistence;
pub use assettree_state as state;
