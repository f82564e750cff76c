//! Wire protocol for fanline peers.
//!
//! Requests and replies are closed enums carried as bincode frames over a
//! small connection abstraction. Anything a node does not recognize on the
//! wire becomes a typed [`Reply::Error`], never a crash.

pub mod message;
pub mod tcp;
pub mod transport;

pub use message::{Message, Reply, Request};
pub use tcp::{TcpDialer, TcpListener, MAX_FRAME_LEN};
pub use transport::{Connection, Dialer, Listener};
