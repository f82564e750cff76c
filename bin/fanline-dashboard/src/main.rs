//! Fanline dashboard daemon.
//!
//! Serves one shard of the dashboard tier: feed queries arrive over HTTP or
//! as forwards from peer dashboard nodes, flow through the dispatcher loop
//! and either execute locally (fanning out to the timeline tier) or relay
//! one hop to the owning dashboard shard.

mod http;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use fanline_common::{ClusterConfig, Error};
use fanline_node::{DashboardServer, Dispatcher, Forwarder, Limiter, RequestHandler, peer};
use fanline_proto::tcp::{TcpDialer, TcpListener};
use fanline_proto::{Dialer, Reply, Request};
use fanline_shard::{Shard, Topology};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// If every slot is held by a forward blocked on a slow peer, the node
// stalls until one frees; the limiter keeps that window observable.
const MAX_OUTSTANDING_REQUESTS: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "fanline-dashboard")]
#[command(about = "Fanline dashboard shard daemon")]
#[command(version)]
struct Args {
    /// System-wide cluster config file
    #[arg(short, long)]
    config: String,

    /// Path for the feed store database
    #[arg(long)]
    db: PathBuf,

    /// Index of this node into the config dashboard array, base 0
    #[arg(short, long)]
    index: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Routing policy for the dashboard tier: every dashboard query goes
/// through the forwarder; nothing else is served here.
struct DashboardNode {
    forwarder: Forwarder<DashboardServer>,
}

#[async_trait]
impl RequestHandler for DashboardNode {
    async fn handle(&self, request: Request, forwarded: bool) -> fanline_common::Result<Reply> {
        match request {
            Request::DashboardQuery { .. } => self.forwarder.route(request, forwarded).await,
            Request::CreatePost { .. } | Request::TimelineQuery { .. } => {
                Err(Error::UnknownRequest)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fanline dashboard node");

    let config = ClusterConfig::read(&args.config)?;
    let here_spec = ClusterConfig::tier_shard(&config.dashboard, args.index)?.clone();
    let topology = Topology::from_specs(&config.dashboard)?;
    let timelines = Topology::from_specs(&config.timeline)?;
    let here = Shard::from(&here_spec);

    let dialer: Arc<dyn Dialer> = Arc::new(TcpDialer::new());
    let server = Arc::new(DashboardServer::open(
        &args.db,
        &config.store,
        timelines,
        Arc::clone(&dialer),
    )?);
    let forwarder = Forwarder::new(topology, here.clone(), dialer, server);
    let handler = Arc::new(DashboardNode { forwarder });

    let mut dispatcher = Dispatcher::new(Limiter::new(MAX_OUTSTANDING_REQUESTS), handler);

    let peer_listener = TcpListener::bind(here.addr).await?;
    peer::serve(peer_listener, dispatcher.source());

    tokio::spawn(http::serve(here_spec.http_addr, dispatcher.source()));

    info!(peer = %here.addr, http = %here_spec.http_addr, "dashboard node serving");
    dispatcher.run().await;
    Ok(())
}
