//! Firehose intake.
//!
//! The firehose is an external stream of post-creation events, delivered as
//! `CreatePost` frames over the ordinary peer transport. The intake dials
//! the configured endpoint, feeds every event into the dispatcher and
//! reconnects with a fixed delay whenever the stream breaks. Events have no
//! reply channel, so completion failures are only logged.

use fanline_node::Job;
use fanline_proto::{Dialer, Message, Request};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Consume the firehose forever.
pub fn stream(
    addr: SocketAddr,
    dialer: Arc<dyn Dialer>,
    jobs: mpsc::Sender<Job>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let mut conn = match dialer.dial(addr).await {
                Ok(conn) => {
                    info!(%addr, "firehose connected");
                    conn
                }
                Err(err) => {
                    warn!("firehose dial failed: {err}");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            };

            loop {
                match conn.recv().await {
                    Ok(Message::Request(request @ Request::CreatePost { .. })) => {
                        let (job, done) = Job::new(request, false);
                        if jobs.send(job).await.is_err() {
                            // Dispatcher is gone; nothing left to feed
                            return;
                        }
                        tokio::spawn(async move {
                            if let Ok(Err(err)) = done.await {
                                warn!("firehose create failed: {err}");
                            }
                        });
                    }
                    Ok(other) => {
                        warn!(?other, "unexpected firehose frame");
                    }
                    Err(err) => {
                        warn!("firehose read failed: {err}");
                        break;
                    }
                }
            }

            let _ = conn.close().await;
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    })
}
