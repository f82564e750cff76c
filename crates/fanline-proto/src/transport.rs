//! Transport abstraction between peers.
//!
//! The routing layer only needs to dial an address, exchange one
//! request/reply pair of [`Message`] frames and close; the traits keep that
//! seam narrow so tests can substitute in-process transports for TCP.

use crate::message::Message;
use async_trait::async_trait;
use fanline_common::Result;
use std::net::SocketAddr;

/// One established peer connection.
#[async_trait]
pub trait Connection: Send + std::fmt::Debug {
    /// Write one message frame.
    async fn send(&mut self, message: &Message) -> Result<()>;

    /// Read the next message frame.
    async fn recv(&mut self) -> Result<Message>;

    /// Close the connection. Dropping a connection releases it too; an
    /// explicit close surfaces shutdown errors.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens outbound connections.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, addr: SocketAddr) -> Result<Box<dyn Connection>>;
}

/// Accepts inbound connections.
#[async_trait]
pub trait Listener: Send {
    async fn accept(&mut self) -> Result<Box<dyn Connection>>;
}
