//! Execution seams between the dispatcher, the router and the tier servers.

use async_trait::async_trait;
use fanline_common::Result;
use fanline_proto::{Reply, Request};

/// Local request execution: a tier server running one request against its
/// own storage. The forwarder calls this once it has decided a request is
/// owned by the local shard.
#[async_trait]
pub trait Service: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Reply>;
}

/// Per-tier routing policy applied by the dispatcher to every admitted
/// request: which variants go through the forwarder, which run straight
/// against the local store, and which are unknown on this tier.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request, forwarded: bool) -> Result<Reply>;
}
