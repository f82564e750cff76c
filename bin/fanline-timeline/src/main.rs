//! Fanline timeline daemon.
//!
//! Serves one shard of the timeline tier: accepts post creations and
//! timeline queries over HTTP, peer forwards from other timeline nodes, and
//! the firehose, funneling everything through one dispatcher loop bounded
//! by the admission limiter.

mod filter;
mod firehose;
mod http;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use fanline_common::{ClusterConfig, Error};
use fanline_node::{Dispatcher, Forwarder, Limiter, RequestHandler, Service, TimelineServer, peer};
use fanline_proto::tcp::{TcpDialer, TcpListener};
use fanline_proto::{Dialer, Reply, Request};
use fanline_shard::{Shard, Topology};
use filter::TimelineFilter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAX_OUTSTANDING_REQUESTS: usize = 300;

#[derive(Parser, Debug)]
#[command(name = "fanline-timeline")]
#[command(about = "Fanline timeline shard daemon")]
#[command(version)]
struct Args {
    /// System-wide cluster config file
    #[arg(short, long)]
    config: String,

    /// Path for the timeline store database
    #[arg(long)]
    db: PathBuf,

    /// Index of this node into the config timeline array, base 0
    #[arg(short, long)]
    index: usize,

    /// Do not read from the firehose
    #[arg(long)]
    no_firehose: bool,

    /// File of accepted timeline ids; creates for any other timeline are
    /// acknowledged and dropped
    #[arg(long)]
    filter: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Routing policy for the timeline tier: creates go through the forwarder
/// so they land on the owning shard, queries answer from the local store.
struct TimelineNode {
    forwarder: Forwarder<TimelineServer>,
    server: Arc<TimelineServer>,
    filter: Option<TimelineFilter>,
}

#[async_trait]
impl RequestHandler for TimelineNode {
    async fn handle(&self, request: Request, forwarded: bool) -> fanline_common::Result<Reply> {
        match &request {
            Request::CreatePost { timeline_id, .. } => {
                let timeline_id = *timeline_id;
                if let Some(filter) = &self.filter
                    && !filter.contains(timeline_id)
                {
                    // Filtered timelines are acknowledged, never stored
                    return Ok(Reply::Success);
                }
                self.forwarder.route(request, forwarded).await
            }
            Request::TimelineQuery { .. } => self.server.execute(request).await,
            Request::DashboardQuery { .. } => Err(Error::UnknownRequest),
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

    info!("Starting fanline timeline node");

    let config = ClusterConfig::read(&args.config)?;
    let here_spec = ClusterConfig::tier_shard(&config.timeline, args.index)?.clone();
    let topology = Topology::from_specs(&config.timeline)?;
    let here = Shard::from(&here_spec);

    let filter = match &args.filter {
        Some(path) => {
            let filter = TimelineFilter::parse(path)?;
            info!(timelines = filter.len(), "timeline filter active");
            Some(filter)
        }
        None => None,
    };

    let server = Arc::new(TimelineServer::open(&args.db, &config.store)?);
    let dialer: Arc<dyn Dialer> = Arc::new(TcpDialer::new());
    let forwarder = Forwarder::new(
        topology,
        here.clone(),
        Arc::clone(&dialer),
        Arc::clone(&server),
    );
    let handler = Arc::new(TimelineNode {
        forwarder,
        server,
        filter,
    });

    let mut dispatcher = Dispatcher::new(Limiter::new(MAX_OUTSTANDING_REQUESTS), handler);

    let peer_listener = TcpListener::bind(here.addr).await?;
    peer::serve(peer_listener, dispatcher.source());

    tokio::spawn(http::serve(here_spec.http_addr, dispatcher.source()));

    if args.no_firehose {
        info!("firehose intake disabled");
    } else if let Some(addr) = config.firehose {
        firehose::stream(addr, dialer, dispatcher.source());
    } else {
        warn!("no firehose endpoint configured");
    }

    info!(peer = %here.addr, http = %here_spec.http_addr, "timeline node serving");
    dispatcher.run().await;
    Ok(())
}
