//! Core identifier and record types.
//!
//! Timelines, dashboards and posts are all identified by signed 64-bit ids
//! assigned upstream; the aliases below keep signatures readable without
//! imposing a newtype at every call site.

use serde::{Deserialize, Serialize};

/// Identifier of a user timeline
pub type TimelineId = i64;

/// Identifier of a dashboard (aggregated feed)
pub type DashboardId = i64;

/// Identifier of a post; monotonically meaningful, so ordering post ids
/// orders posts by creation
pub type PostId = i64;

/// One post as served on a dashboard feed.
///
/// `timeline_id` is the originating timeline, or 0 when the post was read
/// back from materialized feed rows, which do not record the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Timeline the post was published on
    pub timeline_id: TimelineId,
    /// The post itself
    pub post_id: PostId,
}

impl Post {
    #[must_use]
    pub fn new(timeline_id: TimelineId, post_id: PostId) -> Self {
        Self {
            timeline_id,
            post_id,
        }
    }
}
