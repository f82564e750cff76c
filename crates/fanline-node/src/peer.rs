//! Peer listener: turns inbound peer connections into dispatcher jobs.
//!
//! Each connection carries one request/reply exchange. Requests read off a
//! peer connection enter the dispatcher marked `forwarded`, so the routing
//! layer refuses to relay them a second hop. Unreadable or unrecognized
//! frames get a typed error reply, never a dropped connection or a crash.

use crate::dispatch::Job;
use fanline_proto::{Connection, Listener, Message, Reply};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Accept peer connections forever, feeding requests into `jobs`.
pub fn serve<L: Listener + 'static>(mut listener: L, jobs: mpsc::Sender<Job>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok(conn) => {
                    let jobs = jobs.clone();
                    tokio::spawn(handle_connection(conn, jobs));
                }
                Err(err) => {
                    warn!("peer accept failed: {err}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    })
}

async fn handle_connection(mut conn: Box<dyn Connection>, jobs: mpsc::Sender<Job>) {
    let message = match conn.recv().await {
        Ok(message) => message,
        Err(err) => {
            let reply = Reply::Error {
                message: err.to_string(),
            };
            let _ = conn.send(&Message::Reply(reply)).await;
            let _ = conn.close().await;
            return;
        }
    };

    let reply = match message {
        Message::Request(request) => {
            let (job, done) = Job::new(request, true);
            if jobs.send(job).await.is_err() {
                Reply::Error {
                    message: "node is shutting down".to_string(),
                }
            } else {
                match done.await {
                    Ok(result) => Reply::from_result(result),
                    Err(_) => Reply::Error {
                        message: "request dropped".to_string(),
                    },
                }
            }
        }
        Message::Reply(_) => Reply::Error {
            message: "unknown request".to_string(),
        },
    };

    let _ = conn.send(&Message::Reply(reply)).await;
    let _ = conn.close().await;
}
