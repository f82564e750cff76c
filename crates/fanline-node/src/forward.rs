//! Shard routing with single-hop forwarding.
//!
//! Every request names one entity; its hashed key decides the owning shard.
//! A request owned locally executes against the tier server. A request owned
//! elsewhere is relayed to the owner, at most once: a request that arrives
//! already marked as forwarded must be owned locally, anything else means
//! the cluster's topology views disagree and the request fails rather than
//! bouncing between nodes.

use crate::service::Service;
use fanline_common::{Error, Result};
use fanline_proto::{Dialer, Message, Reply, Request};
use fanline_shard::{Shard, ShardKey, Topology};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Routes requests between the local tier server and owning peers.
pub struct Forwarder<S> {
    topology: Topology,
    here: Shard,
    dialer: Arc<dyn Dialer>,
    service: Arc<S>,
}

impl<S: Service> Forwarder<S> {
    pub fn new(topology: Topology, here: Shard, dialer: Arc<dyn Dialer>, service: Arc<S>) -> Self {
        Self {
            topology,
            here,
            dialer,
            service,
        }
    }

    /// Serve the request locally or relay it one hop to the owning shard.
    pub async fn route(&self, request: Request, already_forwarded: bool) -> Result<Reply> {
        let owner = self.topology.find(ShardKey::of(request.entity_id()));
        if owner.pivot == self.here.pivot {
            return self.service.execute(request).await;
        }
        if already_forwarded {
            return Err(Error::Reforward);
        }
        let addr = owner.addr;
        debug!(entity_id = request.entity_id(), peer = %addr, "forwarding request");
        exchange(self.dialer.as_ref(), addr, request).await
    }
}

/// Dial a peer, send one request, read one reply and close the connection
/// on every exit path.
pub async fn exchange(dialer: &dyn Dialer, addr: SocketAddr, request: Request) -> Result<Reply> {
    let mut conn = dialer.dial(addr).await?;
    let sent = conn.send(&Message::Request(request)).await;
    let received = match sent {
        Ok(()) => conn.recv().await,
        Err(err) => Err(err),
    };
    let _ = conn.close().await;
    match received? {
        Message::Reply(reply) => reply.into_result(),
        Message::Request(_) => Err(Error::UnknownResponse),
    }
}
