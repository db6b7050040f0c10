//! Service composition root

use std::sync::Arc;
use std::time::Instant;

use assettree_cache::{CacheError, CacheStats, LruCache};
use assettree_common::Validatable;
use assettree_performance::{PerformanceError, PerformanceMonitor};
use assettree_persistence::{PersistenceError, PersistenceManager};
use assettree_state::AssetId;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::config::{AssetTreeConfig, ConfigError};
use crate::session::TreeStateSession;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Performance(#[from] PerformanceError),
}

/// Every long-lived service, constructed once and passed to whoever needs it
pub struct AssetTreeServices {
    config: AssetTreeConfig,
    session: Arc<TreeStateSession>,
    monitor: PerformanceMonitor,
    search_cache: Mutex<LruCache<String, Vec<AssetId>>>,
}

impl AssetTreeServices {
    /// Validate the config, build the services and restore stored state
    pub async fn bootstrap(config: AssetTreeConfig) -> Result<Self, ServiceError> {
        config.validate().map_err(ConfigError::from)?;

        let persistence = Arc::new(PersistenceManager::new(
            config.storage.open(),
            config.persistence.clone(),
        ));
        let session = Arc::new(TreeStateSession::new(persistence, config.autosave_delay()));
        let restored = session.restore().await;

        let monitor = PerformanceMonitor::with_thresholds(config.performance.clone());
        monitor.start_memory_sampling()?;

        let search_cache = Mutex::new(LruCache::new(config.search_cache_capacity)?);

        info!(
            backend = ?config.storage.backend,
            key = %config.persistence.storage_key,
            restored,
            "Asset tree services started"
        );
        Ok(Self {
            config,
            session,
            monitor,
            search_cache,
        })
    }

    pub fn config(&self) -> &AssetTreeConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<TreeStateSession> {
        &self.session
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn persistence(&self) -> &Arc<PersistenceManager> {
        self.session.persistence()
    }

    /// Search results for `query`, computed on a cache miss.
    ///
    /// Search time and the cache hit rate are reported to the monitor.
    pub fn cached_search<F>(&self, query: &str, compute: F) -> Vec<AssetId>
    where
        F: FnOnce(&str) -> Vec<AssetId>,
    {
        let key = query.trim().to_lowercase();
        let mut cache = self.search_cache.lock();

        let results = match cache.get(&key) {
            Some(hit) => hit.clone(),
            None => {
                let start = Instant::now();
                let results = compute(&key);
                self.monitor
                    .record_search_time(start.elapsed().as_secs_f64() * 1000.0);
                cache.set(key, results.clone());
                results
            }
        };

        let hit_rate = cache.stats().hit_rate();
        drop(cache);
        self.monitor.update_cache_hit_rate(hit_rate);
        results
    }

    pub fn search_cache_stats(&self) -> CacheStats {
        self.search_cache.lock().stats()
    }

    /// Drop cached search results, e.g. after the hierarchy changed
    pub fn invalidate_search_cache(&self) {
        self.search_cache.lock().clear();
    }

    /// Flush pending saves and stop background sampling
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        let flushed = self.session.flush().await;
        self.monitor.destroy();
        let flushed = flushed?;
        info!(flushed = flushed.is_some(), "Asset tree services stopped");
        Ok(())
    }
}
