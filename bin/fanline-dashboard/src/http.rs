//! Client HTTP surface for the dashboard tier.
//!
//! Example curl:
//!     curl "localhost:5280/dash?DashID=5&UpperPostID=55&Limit=10&Followed=%5B%225%22%2C%227%22%5D"

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use fanline_common::TimelineId;
use fanline_node::Job;
use fanline_proto::{Reply, Request};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Largest page a client may ask for
pub const MAX_LIMIT: usize = 100;

type Params = HashMap<String, String>;
type HttpError = (StatusCode, String);

/// Serve the HTTP API until the process exits.
pub async fn serve(addr: SocketAddr, jobs: mpsc::Sender<Job>) {
    let app = Router::new()
        .route("/dash", get(handle_query))
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

async fn handle_query(
    State(jobs): State<mpsc::Sender<Job>>,
    Query(params): Query<Params>,
) -> Result<Response, HttpError> {
    let dashboard_id = parse_i64(&params, "DashID", "dashboard id")?;
    let before_post_id = parse_i64(&params, "UpperPostID", "pivot post id")?;
    let limit = parse_limit(&params)?;
    let follows = parse_follows(&params)?;

    let request = Request::DashboardQuery {
        dashboard_id,
        before_post_id,
        limit,
        follows,
    };

    let (job, done) = Job::new(request, false);
    if jobs.send(job).await.is_err() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "node is shutting down".to_string(),
        ));
    }

    match done.await {
        Ok(Ok(Reply::DashboardQuerySuccess { posts })) => {
            let body = serde_json::to_string(&posts).map_err(|err| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("encoding error: {err}"),
                )
            })?;
            Ok((
                [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
                body,
            )
                .into_response())
        }
        Ok(Ok(_)) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "unexpected reply type".to_string(),
        )),
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

/// Parse the followed timeline list.
///
/// A missing or malformed `Followed` array degrades to an empty follow list
/// rather than an error; individual ids that fail to parse are still the
/// caller's problem.
fn parse_follows(params: &Params) -> Result<Vec<TimelineId>, HttpError> {
    let Some(raw) = params.get("Followed") else {
        return Ok(Vec::new());
    };
    let strings: Vec<String> = match serde_json::from_str(raw) {
        Ok(strings) => strings,
        Err(err) => {
            warn!("cannot parse follows array: {err}");
            return Ok(Vec::new());
        }
    };
    let mut follows = Vec::with_capacity(strings.len());
    for s in &strings {
        let id: TimelineId = s.parse().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                "followed ID cannot parse".to_string(),
            )
        })?;
        follows.push(id);
    }
    Ok(follows)
}
