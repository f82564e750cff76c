//! Dashboard tier server.
//!
//! A dashboard query names the timelines the dashboard follows; the server
//! fans the equivalent timeline query out to each followed timeline's owning
//! shard, merges the pages newest-first and truncates to the requested
//! limit. Any fan-out failure fails the whole query: a feed is either
//! complete or an error, never partial.
//!
//! The server also owns materialized feed rows in its local store. Those
//! rows are existence-only and answer queries that carry no follow list.

use crate::forward::exchange;
use crate::service::Service;
use async_trait::async_trait;
use fanline_common::config::StoreConfig;
use fanline_common::{DashboardId, Error, Post, PostId, Result, TimelineId};
use fanline_proto::{Dialer, Reply, Request};
use fanline_shard::{ShardKey, Topology};
use fanline_store::{SeriesStore, StoreResult};
use futures::StreamExt;
use futures::stream;
use std::path::Path;
use std::sync::Arc;

/// Maximum concurrent timeline queries per dashboard query
const MAX_CONCURRENT_FANOUT: usize = 32;

/// Serves one dashboard shard: local feed rows plus timeline fan-out.
pub struct DashboardServer {
    store: SeriesStore,
    timelines: Topology,
    dialer: Arc<dyn Dialer>,
}

impl DashboardServer {
    /// Open the feed store under `path`, serving fan-out queries against the
    /// given timeline tier.
    pub fn open(
        path: impl AsRef<Path>,
        config: &StoreConfig,
        timelines: Topology,
        dialer: Arc<dyn Dialer>,
    ) -> StoreResult<Self> {
        Ok(Self {
            store: SeriesStore::open(path, config)?,
            timelines,
            dialer,
        })
    }

    #[must_use]
    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    /// Materialize one feed row for a dashboard.
    pub fn create(&self, dashboard_id: DashboardId, post_id: PostId) -> StoreResult<()> {
        self.store.create(dashboard_id, post_id)
    }

    /// Page backwards through a dashboard's feed.
    pub async fn query(
        &self,
        dashboard_id: DashboardId,
        before_post_id: PostId,
        limit: usize,
        follows: &[TimelineId],
    ) -> Result<Vec<Post>> {
        if before_post_id <= 0 {
            return Err(Error::invalid_argument(
                "non-positive post id is not a valid post",
            ));
        }

        if follows.is_empty() {
            // Materialized feed rows do not record the origin timeline
            let posts = self.store.query(dashboard_id, before_post_id, limit)?;
            return Ok(posts.into_iter().map(|post_id| Post::new(0, post_id)).collect());
        }

        let mut fanout = stream::iter(follows.iter().copied())
            .map(|timeline_id| self.query_timeline(timeline_id, before_post_id, limit))
            .buffer_unordered(MAX_CONCURRENT_FANOUT);

        let mut merged: Vec<Post> = Vec::new();
        while let Some(result) = fanout.next().await {
            let (timeline_id, posts) = result?;
            merged.extend(posts.into_iter().map(|p| Post::new(timeline_id, p)));
        }

        merged.sort_unstable_by(|a, b| b.post_id.cmp(&a.post_id));
        merged.truncate(limit);
        Ok(merged)
    }

    /// Ask one timeline's owning shard for the page before `before_post_id`.
    async fn query_timeline(
        &self,
        timeline_id: TimelineId,
        before_post_id: PostId,
        limit: usize,
    ) -> Result<(TimelineId, Vec<PostId>)> {
        let addr = self.timelines.find(ShardKey::of(timeline_id)).addr;
        let request = Request::TimelineQuery {
            timeline_id,
            before_post_id,
            limit,
        };
        match exchange(self.dialer.as_ref(), addr, request).await? {
            Reply::TimelineQuerySuccess { posts } => Ok((timeline_id, posts)),
            _ => Err(Error::UnknownResponse),
        }
    }
}

#[async_trait]
impl Service for DashboardServer {
    async fn execute(&self, request: Request) -> Result<Reply> {
        match request {
            Request::DashboardQuery {
                dashboard_id,
                before_post_id,
                limit,
                follows,
            } => {
                let posts = self
                    .query(dashboard_id, before_post_id, limit, &follows)
                    .await?;
                Ok(Reply::DashboardQuerySuccess { posts })
            }
            Request::CreatePost { .. } | Request::TimelineQuery { .. } => {
                Err(Error::UnknownRequest)
            }
        }
    }
}
