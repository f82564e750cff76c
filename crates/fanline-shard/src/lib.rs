//! Row-key encoding and shard ownership for fanline.
//!
//! Two small pieces every node needs: the ordered binary row key that both
//! tiers store under, and the static topology that decides which node owns a
//! hashed entity key.

pub mod rowkey;
pub mod topology;

pub use rowkey::{ROW_KEY_LEN, RowKey, RowKeyError};
pub use topology::{Shard, ShardKey, Topology};
