//! Typed request and reply messages.

use fanline_common::{DashboardId, Error, Post, PostId, Result, TimelineId};
use serde::{Deserialize, Serialize};

/// A request as carried between peers and produced by the client surfaces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Record that a post exists on a timeline
    CreatePost {
        timeline_id: TimelineId,
        post_id: PostId,
    },
    /// Page backwards through one timeline
    TimelineQuery {
        timeline_id: TimelineId,
        before_post_id: PostId,
        limit: usize,
    },
    /// Page backwards through a dashboard's aggregated feed
    DashboardQuery {
        dashboard_id: DashboardId,
        before_post_id: PostId,
        limit: usize,
        follows: Vec<TimelineId>,
    },
}

impl Request {
    /// The entity whose hashed key decides which shard owns this request.
    #[must_use]
    pub fn entity_id(&self) -> i64 {
        match self {
            Self::CreatePost { timeline_id, .. }
            | Self::TimelineQuery { timeline_id, .. } => *timeline_id,
            Self::DashboardQuery { dashboard_id, .. } => *dashboard_id,
        }
    }
}

/// A reply to one [`Request`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Success,
    TimelineQuerySuccess { posts: Vec<PostId> },
    DashboardQuerySuccess { posts: Vec<Post> },
    Error { message: String },
}

impl Reply {
    /// Collapse a processing result into the reply written to a peer.
    #[must_use]
    pub fn from_result(result: Result<Self>) -> Self {
        match result {
            Ok(reply) => reply,
            Err(err) => Self::Error {
                message: err.to_string(),
            },
        }
    }

    /// Lift an error-typed reply back into an error, as the forwarding
    /// side of the exchange sees it.
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::Error { message } => Err(Error::remote(message)),
            reply => Ok(reply),
        }
    }
}

/// One frame on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Request(Request),
    Reply(Reply),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_routing_field() {
        let create = Request::CreatePost {
            timeline_id: 5,
            post_id: 99,
        };
        assert_eq!(create.entity_id(), 5);

        let query = Request::TimelineQuery {
            timeline_id: 7,
            before_post_id: 10,
            limit: 3,
        };
        assert_eq!(query.entity_id(), 7);

        let dash = Request::DashboardQuery {
            dashboard_id: 11,
            before_post_id: 10,
            limit: 3,
            follows: vec![5, 7],
        };
        assert_eq!(dash.entity_id(), 11);
    }

    #[test]
    fn test_reply_from_result() {
        assert_eq!(Reply::from_result(Ok(Reply::Success)), Reply::Success);
        let reply = Reply::from_result(Err(Error::invalid_argument("bad limit")));
        assert_eq!(
            reply,
            Reply::Error {
                message: "invalid argument: bad limit".to_string()
            }
        );
    }

    #[test]
    fn test_reply_into_result() {
        assert!(Reply::Success.into_result().is_ok());
        let err = Reply::Error {
            message: "boom".to_string(),
        }
        .into_result()
        .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }

    #[test]
    fn test_message_codec_round_trip() {
        let frames = [
            Message::Request(Request::CreatePost {
                timeline_id: 1,
                post_id: 2,
            }),
            Message::Request(Request::DashboardQuery {
                dashboard_id: 4,
                before_post_id: 100,
                limit: 10,
                follows: vec![1, 2, 3],
            }),
            Message::Reply(Reply::TimelineQuerySuccess {
                posts: vec![54, 53, 52, 51],
            }),
            Message::Reply(Reply::DashboardQuerySuccess {
                posts: vec![Post::new(5, 54), Post::new(7, 99)],
            }),
        ];
        for frame in frames {
            let raw = bincode::serialize(&frame).unwrap();
            let back: Message = bincode::deserialize(&raw).unwrap();
            assert_eq!(back, frame);
        }
    }
}
