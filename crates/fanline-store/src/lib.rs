//! Persistent ordered storage for fanline tiers.
//!
//! Both server kinds store the same shape of data: existence-only rows under
//! an ordered 16-byte row key. [`SeriesStore`] wraps the embedded database
//! and carries the tier's durability cadence and usage counters.

pub mod series;
pub mod tables;

pub use series::{SeriesStore, StoreError, StoreResult};
