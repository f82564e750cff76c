//! Client HTTP surface for the timeline tier.
//!
//! Example curls:
//!     curl -X POST "localhost:5180/post?TimelineID=5&PostID=54"
//!     curl "localhost:5180/timeline?TimelineID=5&BeforePostID=56&Limit=10"

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use fanline_node::Job;
use fanline_proto::{Reply, Request};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Largest page a client may ask for
pub const MAX_LIMIT: usize = 100;

type Params = HashMap<String, String>;
type HttpError = (StatusCode, String);

/// Serve the HTTP API until the process exits.
pub async fn serve(addr: SocketAddr, jobs: mpsc::Sender<Job>) {
    let app = Router::new()
        .route("/post", post(handle_create))
        .route("/timeline", get(handle_query))
        .layer(TraceLayer::new_for_http())
        .with_state(jobs);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("cannot bind http listener on {addr}: {err}");
            return;
        }
    };
    info!(%addr, "http listener up");
    if let Err(err) = axum::serve(listener, app).await {
        error!("http server failed: {err}");
    }
}

async fn handle_create(
    State(jobs): State<mpsc::Sender<Job>>,
    Query(params): Query<Params>,
) -> Result<StatusCode, HttpError> {
    let timeline_id = parse_i64(&params, "TimelineID", "timeline id")?;
    let post_id = parse_i64(&params, "PostID", "post id")?;

    match submit(
        &jobs,
        Request::CreatePost {
            timeline_id,
            post_id,
        },
    )
    .await?
    {
        Reply::Success => Ok(StatusCode::OK),
        _ => Err(unexpected_reply()),
    }
}

async fn handle_query(
    State(jobs): State<mpsc::Sender<Job>>,
    Query(params): Query<Params>,
) -> Result<Json<Vec<i64>>, HttpError> {
    let timeline_id = parse_i64(&params, "TimelineID", "timeline id")?;
    let before_post_id = parse_i64(&params, "BeforePostID", "pivot post id")?;
    let limit = parse_limit(&params)?;

    match submit(
        &jobs,
        Request::TimelineQuery {
            timeline_id,
            before_post_id,
            limit,
        },
    )
    .await?
    {
        Reply::TimelineQuerySuccess { posts } => Ok(Json(posts)),
        _ => Err(unexpected_reply()),
    }
}

/// Hand the request to the dispatcher and wait for its completion.
async fn submit(jobs: &mpsc::Sender<Job>, request: Request) -> Result<Reply, HttpError> {
    let (job, done) = Job::new(request, false);
    if jobs.send(job).await.is_err() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "node is shutting down".to_string(),
        ));
    }
    match done.await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(err)) => {
            let status = StatusCode::from_u16(err.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = if status == StatusCode::BAD_REQUEST {
                err.to_string()
            } else {
                format!("internal error: {err}")
            };
            Err((status, body))
        }
        Err(_) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "request dropped".to_string(),
        )),
    }
}

fn parse_i64(params: &Params, field: &str, what: &str) -> Result<i64, HttpError> {
    params
        .get(field)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("{what} missing or fails to parse as an integer"),
            )
        })
}

fn parse_limit(params: &Params) -> Result<usize, HttpError> {
    let limit: usize = params
        .get("Limit")
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "limit missing or fails to parse as an integer".to_string(),
            )
        })?;
    if limit > MAX_LIMIT {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("limit exceeds {MAX_LIMIT}"),
        ));
    }
    Ok(limit)
}

fn unexpected_reply() -> HttpError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "unexpected reply type".to_string(),
    )
}
