//! Node runtime for fanline tiers.
//!
//! A node is one dispatcher loop fed by every request source the tier has
//! (HTTP, peers, firehose), a counting limiter that caps the number of
//! in-flight request tasks, a forwarder that relays non-local requests one
//! hop to the owning shard, and the tier server executing local requests
//! against the series store.

pub mod dashboard;
pub mod dispatch;
pub mod forward;
pub mod limiter;
pub mod peer;
pub mod service;
pub mod timeline;

pub use dashboard::DashboardServer;
pub use dispatch::{Dispatcher, Job};
pub use forward::Forwarder;
pub use limiter::{Limiter, Permit};
pub use service::{RequestHandler, Service};
pub use timeline::TimelineServer;
