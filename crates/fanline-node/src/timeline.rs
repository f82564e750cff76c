//! Timeline tier server.

use crate::service::Service;
use async_trait::async_trait;
use fanline_common::config::StoreConfig;
use fanline_common::{Error, Result};
use fanline_proto::{Reply, Request};
use fanline_store::{SeriesStore, StoreResult};
use std::path::Path;

/// Serves one timeline shard's rows out of the local series store.
pub struct TimelineServer {
    store: SeriesStore,
}

impl TimelineServer {
    /// Open the timeline store under `path`.
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self {
            store: SeriesStore::open(path, config)?,
        })
    }

    #[must_use]
    pub fn store(&self) -> &SeriesStore {
        &self.store
    }
}

#[async_trait]
impl Service for TimelineServer {
    async fn execute(&self, request: Request) -> Result<Reply> {
        match request {
            Request::CreatePost {
                timeline_id,
                post_id,
            } => {
                self.store.create(timeline_id, post_id)?;
                Ok(Reply::Success)
            }
            Request::TimelineQuery {
                timeline_id,
                before_post_id,
                limit,
            } => {
                let posts = self.store.query(timeline_id, before_post_id, limit)?;
                Ok(Reply::TimelineQuerySuccess { posts })
            }
            Request::DashboardQuery { .. } => Err(Error::UnknownRequest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_server(dir: &TempDir) -> TimelineServer {
        TimelineServer::open(dir.path().join("timeline.redb"), &StoreConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_page_backwards() {
        let dir = TempDir::new().unwrap();
        let server = open_server(&dir);

        for post in [51, 52, 53, 54] {
            let reply = server
                .execute(Request::CreatePost {
                    timeline_id: 5,
                    post_id: post,
                })
                .await
                .unwrap();
            assert_eq!(reply, Reply::Success);
        }

        let reply = server
            .execute(Request::TimelineQuery {
                timeline_id: 5,
                before_post_id: 56,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(
            reply,
            Reply::TimelineQuerySuccess {
                posts: vec![54, 53, 52, 51]
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_pivot_is_invalid_argument() {
        let dir = TempDir::new().unwrap();
        let server = open_server(&dir);

        let err = server
            .execute(Request::TimelineQuery {
                timeline_id: 5,
                before_post_id: 0,
                limit: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_dashboard_query_is_unknown_here() {
        let dir = TempDir::new().unwrap();
        let server = open_server(&dir);

        let err = server
            .execute(Request::DashboardQuery {
                dashboard_id: 1,
                before_post_id: 10,
                limit: 5,
                follows: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRequest));
    }
}
