//! Cluster configuration file model.
//!
//! One TOML file describes the whole cluster and is shipped to every node;
//! a node learns its own identity from the `--index` flag into the shard
//! array for its tier. The topology described here is static: fanline has no
//! rebalancing protocol, so the file is read once at startup and never
//! re-read.
//!
//! ```toml
//! firehose = "10.0.0.9:4000"
//!
//! [store]
//! sync_every = 100
//! cache_mb = 64
//!
//! [[timeline]]
//! pivot = 0x0000000000000000
//! addr = "10.0.0.1:5100"
//! http_addr = "10.0.0.1:5180"
//!
//! [[dashboard]]
//! pivot = 0x4000000000000000
//! addr = "10.0.0.2:5200"
//! http_addr = "10.0.0.2:5280"
//! ```
//!
//! TOML integers are signed 64-bit, so pivots are limited to the lower half
//! of the `u64` key space; xor-distance ownership works the same with any
//! spread of distinct pivots.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// System-wide cluster configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Timeline tier shards, in pivot order
    #[serde(default)]
    pub timeline: Vec<ShardSpec>,
    /// Dashboard tier shards, in pivot order
    #[serde(default)]
    pub dashboard: Vec<ShardSpec>,
    /// Firehose ingestion endpoint, if the cluster has one
    #[serde(default)]
    pub firehose: Option<SocketAddr>,
    /// Store tuning shared by all nodes
    #[serde(default)]
    pub store: StoreConfig,
}

/// One shard slot in a tier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShardSpec {
    /// Ownership pivot in the hashed key space
    pub pivot: u64,
    /// Peer listener address
    pub addr: SocketAddr,
    /// Client HTTP listener address
    pub http_addr: SocketAddr,
}

/// Store tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Force a durable sync on every Nth write
    #[serde(default = "default_sync_every")]
    pub sync_every: u64,
    /// In-memory cache size in MB, engine default when unset
    #[serde(default)]
    pub cache_mb: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_every: default_sync_every(),
            cache_mb: None,
        }
    }
}

fn default_sync_every() -> u64 {
    100
}

impl ClusterConfig {
    /// Read and parse the cluster config file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::configuration(format!("cannot parse {}: {e}", path.display())))?;
        Ok(config)
    }

    /// Select one tier shard by node index.
    pub fn tier_shard<'a>(tier: &'a [ShardSpec], index: usize) -> Result<&'a ShardSpec> {
        tier.get(index).ok_or_else(|| {
            Error::configuration(format!(
                "node index {index} out of range for a tier of {} shards",
                tier.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        firehose = "10.0.0.9:4000"

        [store]
        sync_every = 50

        [[timeline]]
        pivot = 0
        addr = "10.0.0.1:5100"
        http_addr = "10.0.0.1:5180"

        [[timeline]]
        pivot = 4611686018427387904
        addr = "10.0.0.2:5100"
        http_addr = "10.0.0.2:5180"

        [[dashboard]]
        pivot = 0
        addr = "10.0.0.3:5200"
        http_addr = "10.0.0.3:5280"
    "#;

    #[test]
    fn test_parse_cluster_config() {
        let config: ClusterConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.timeline.len(), 2);
        assert_eq!(config.dashboard.len(), 1);
        assert_eq!(config.timeline[1].pivot, 1u64 << 62);
        assert_eq!(config.store.sync_every, 50);
        assert_eq!(config.store.cache_mb, None);
        assert!(config.firehose.is_some());
    }

    #[test]
    fn test_store_defaults() {
        let config: ClusterConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.sync_every, 100);
        assert!(config.timeline.is_empty());
    }

    #[test]
    fn test_tier_shard_out_of_range() {
        let config: ClusterConfig = toml::from_str(SAMPLE).unwrap();
        assert!(ClusterConfig::tier_shard(&config.timeline, 1).is_ok());
        assert!(ClusterConfig::tier_shard(&config.timeline, 2).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let err = ClusterConfig::read("/nonexistent/fanline.toml").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
