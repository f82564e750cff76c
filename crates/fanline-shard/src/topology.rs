//! Static shard ownership topology.
//!
//! Each tier (timeline, dashboard) is partitioned over a set of shards, one
//! per node. An entity id is projected into the hashed key space with xxh64
//! and owned by the shard whose pivot is xor-closest to the projection.
//! Distinct pivots make the minimum unique, so every key is owned by exactly
//! one shard and the partition is gap-free.
//!
//! The topology is populated once from the cluster config and never mutated;
//! there is no rebalancing protocol.

use fanline_common::config::ShardSpec;
use fanline_common::{Error, Result};
use std::net::SocketAddr;
use xxhash_rust::xxh64::xxh64;

/// Position of an entity in the hashed shard-key space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShardKey(pub u64);

impl ShardKey {
    /// Project an entity id into the shard-key space.
    #[must_use]
    pub fn of(entity_id: i64) -> Self {
        Self(xxh64(&entity_id.to_be_bytes(), 0))
    }
}

/// One node's ownership slot in a tier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shard {
    /// Ownership pivot; doubles as the shard's identity within its tier
    pub pivot: ShardKey,
    /// Peer listener address of the owning node
    pub addr: SocketAddr,
}

impl From<&ShardSpec> for Shard {
    fn from(spec: &ShardSpec) -> Self {
        Self {
            pivot: ShardKey(spec.pivot),
            addr: spec.addr,
        }
    }
}

/// Immutable shard set for one tier
#[derive(Clone, Debug)]
pub struct Topology {
    shards: Vec<Shard>,
}

impl Topology {
    /// Build the topology from the configured shard list.
    ///
    /// An empty tier or duplicate pivots cannot partition the key space and
    /// are rejected as configuration errors.
    pub fn populate(shards: Vec<Shard>) -> Result<Self> {
        if shards.is_empty() {
            return Err(Error::configuration("tier has no shards"));
        }
        let mut pivots: Vec<u64> = shards.iter().map(|s| s.pivot.0).collect();
        pivots.sort_unstable();
        if pivots.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::configuration("duplicate shard pivots"));
        }
        Ok(Self { shards })
    }

    /// Build a tier topology straight from config specs.
    pub fn from_specs(specs: &[ShardSpec]) -> Result<Self> {
        Self::populate(specs.iter().map(Shard::from).collect())
    }

    /// Find the shard owning `key`.
    ///
    /// Total over the whole key space. A topology that cannot own a key is a
    /// broken cluster invariant, and a node with a broken topology must not
    /// serve traffic, so that case panics instead of returning an error.
    #[must_use]
    pub fn find(&self, key: ShardKey) -> &Shard {
        self.shards
            .iter()
            .min_by_key(|shard| shard.pivot.0 ^ key.0)
            .expect("no shard owns the key space")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shard> {
        self.shards.iter()
    }
}
