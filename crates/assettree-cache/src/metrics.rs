//! Cache statistics

use serde::{Deserialize, Serialize};

/// Snapshot of cache accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries currently held
    pub size: usize,
    /// Fixed capacity
    pub capacity: usize,
    /// Lookups that found a value
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries dropped to make room for new keys
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a fraction (0.0 to 1.0); 0.0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Miss rate as a fraction (0.0 to 1.0)
    pub fn miss_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            1.0 - self.hit_rate()
        }
    }

    /// Fill level as a fraction of capacity
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.size as f64 / self.capacity as f64
        }
    }

    /// Get a formatted summary of cache statistics
    pub fn summary(&self) -> String {
        format!(
            "Cache Stats:\n  Entries: {}/{}\n  Hits: {}\n  Misses: {}\n  Hit Rate: {:.2}%\n  Evictions: {}",
            self.size,
            self.capacity,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.evictions
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 75,
            misses: 25,
            ..CacheStats::default()
        };

        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(stats.miss_rate(), 0.25);
    }

    #[test]
    fn test_empty_stats_rates_are_zero() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 0.0);
        assert_eq!(stats.utilization(), 0.0);
    }

    #[test]
    fn test_summary_mentions_hit_rate() {
        let stats = CacheStats {
            size: 2,
            capacity: 4,
            hits: 1,
            misses: 1,
            evictions: 0,
        };
        assert!(stats.summary().contains("Hit Rate: 50.00%"));
        assert_eq!(stats.utilization(), 0.5);
    }

    #[test]
    fn test_stats_serialize_for_diagnostics() {
        let stats = CacheStats {
            size: 1,
            capacity: 8,
            hits: 3,
            misses: 2,
            evictions: 1,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["hits"], 3);
        assert_eq!(json["evictions"], 1);
    }
}
