//! Common types and utilities shared across fanline crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ClusterConfig, ShardSpec, StoreConfig};
pub use error::{Error, Result};
pub use types::{DashboardId, Post, PostId, TimelineId};
