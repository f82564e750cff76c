//! Plain TCP transport.
//!
//! Frames are a u32 big-endian length prefix followed by the bincode
//! encoding of one [`Message`]. Frames above [`MAX_FRAME_LEN`] are rejected
//! on both sides; a peer announcing one is treated as a broken connection.

use crate::message::Message;
use crate::transport::{Connection, Dialer, Listener};
use async_trait::async_trait;
use fanline_common::{Error, Result};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Upper bound for one frame; generous for the largest dashboard reply.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// One framed TCP peer connection.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, message: &Message) -> Result<()> {
        let payload =
            bincode::serialize(message).map_err(|e| Error::Encoding(e.to_string()))?;
        if payload.len() > MAX_FRAME_LEN {
            return Err(Error::Encoding(format!(
                "frame of {} bytes exceeds the {MAX_FRAME_LEN} byte cap",
                payload.len()
            )));
        }
        self.stream
            .write_all(&(payload.len() as u32).to_be_bytes())
            .await?;
        self.stream.write_all(&payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Message> {
        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(Error::connection_failed(format!(
                "peer announced a frame of {len} bytes, cap is {MAX_FRAME_LEN}"
            )));
        }
        let mut payload = vec![0u8; len];
        self.stream.read_exact(&mut payload).await?;
        bincode::deserialize(&payload).map_err(|e| Error::Encoding(e.to_string()))
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Dials framed TCP connections to peers.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpDialer;

impl TcpDialer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, addr: SocketAddr) -> Result<Box<dyn Connection>> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::connection_failed(format!("dial {addr}: {e}")))?;
        // Request/reply exchanges are single small frames
        let _ = stream.set_nodelay(true);
        Ok(Box::new(TcpConnection::new(stream)))
    }
}

/// Accepts framed TCP connections from peers.
pub struct TcpListener {
    inner: tokio::net::TcpListener,
}

impl TcpListener {
    /// Bind the peer listener.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let inner = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::connection_failed(format!("bind {addr}: {e}")))?;
        Ok(Self { inner })
    }

    /// The bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }
}

#[async_trait]
impl Listener for TcpListener {
    async fn accept(&mut self) -> Result<Box<dyn Connection>> {
        let (stream, _) = self.inner.accept().await?;
        let _ = stream.set_nodelay(true);
        Ok(Box::new(TcpConnection::new(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Reply, Request};

    #[tokio::test]
    async fn test_loopback_round_trip() {
        let mut listener = TcpListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut conn = listener.accept().await.unwrap();
            let frame = conn.recv().await.unwrap();
            assert_eq!(
                frame,
                Message::Request(Request::CreatePost {
                    timeline_id: 5,
                    post_id: 54,
                })
            );
            conn.send(&Message::Reply(Reply::Success)).await.unwrap();
            conn.close().await.unwrap();
        });

        let mut conn = TcpDialer::new().dial(addr).await.unwrap();
        conn.send(&Message::Request(Request::CreatePost {
            timeline_id: 5,
            post_id: 54,
        }))
        .await
        .unwrap();
        assert_eq!(conn.recv().await.unwrap(), Message::Reply(Reply::Success));
        conn.close().await.unwrap();

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut listener = TcpListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut conn = listener.accept().await.unwrap();
            conn.recv().await
        });

        // Announce a frame far over the cap, straight onto the socket.
        let mut raw = TcpStream::connect(addr).await.unwrap();
        raw.write_all(&u32::try_from(MAX_FRAME_LEN + 1).unwrap().to_be_bytes())
            .await
            .unwrap();
        raw.flush().await.unwrap();

        let err = server.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_dial_refused() {
        // Port 1 on loopback is not listening.
        let err = TcpDialer::new()
            .dial("127.0.0.1:1".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionFailed(_)));
    }
}
