//! The per-node request dispatcher.
//!
//! One loop multiplexes every request source the tier has. Sources are
//! mpsc channels of [`Job`]s; the loop waits for the next job from any
//! ready source without priority ordering, admits it through the limiter,
//! and runs it as its own task so a slow request never blocks the loop.

use crate::limiter::Limiter;
use crate::service::RequestHandler;
use fanline_common::Result;
use fanline_proto::{Reply, Request};
use futures::StreamExt;
use futures::stream::select_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// How many jobs a source channel buffers before its producer backs off
pub const SOURCE_BUFFER: usize = 64;

/// One normalized unit of work, from any source.
pub struct Job {
    pub request: Request,
    /// True when the request arrived over the peer listener and must not be
    /// relayed again
    pub forwarded: bool,
    /// Completion handle; consumed by the send, so it fires exactly once
    pub done: oneshot::Sender<Result<Reply>>,
}

impl Job {
    /// Pair a job with the receiver its completion will arrive on.
    #[must_use]
    pub fn new(request: Request, forwarded: bool) -> (Self, oneshot::Receiver<Result<Reply>>) {
        let (done, rx) = oneshot::channel();
        (
            Self {
                request,
                forwarded,
                done,
            },
            rx,
        )
    }
}

/// Dispatcher loop state for one node.
pub struct Dispatcher {
    limiter: Limiter,
    handler: Arc<dyn RequestHandler>,
    sources: Vec<mpsc::Receiver<Job>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(limiter: Limiter, handler: Arc<dyn RequestHandler>) -> Self {
        Self {
            limiter,
            handler,
            sources: Vec::new(),
        }
    }

    /// Register one request source and get the sender its producer feeds.
    pub fn source(&mut self) -> mpsc::Sender<Job> {
        let (tx, rx) = mpsc::channel(SOURCE_BUFFER);
        self.sources.push(rx);
        tx
    }

    /// Run the dispatch loop until every source sender is dropped.
    ///
    /// The loop blocks only while waiting for the next job and while the
    /// limiter is saturated; each admitted job runs in its own task and
    /// releases its slot when it finishes, success or failure.
    pub async fn run(self) {
        let mut sources = select_all(self.sources.into_iter().map(ReceiverStream::new));
        let finished = Arc::new(AtomicU64::new(0));
        let mut started: u64 = 0;

        while let Some(job) = sources.next().await {
            let permit = self.limiter.admit().await;
            started += 1;
            if started % 1000 == 0 {
                debug!(
                    started,
                    in_flight = self.limiter.capacity() - self.limiter.available(),
                    "dispatching"
                );
            }

            let handler = Arc::clone(&self.handler);
            let finished = Arc::clone(&finished);
            tokio::spawn(async move {
                // Slot held for the task's whole lifetime
                let _permit = permit;
                let result = handler.handle(job.request, job.forwarded).await;
                if let Err(err) = &result {
                    debug!("request failed: {err}");
                }
                // The caller may have given up; that is its business
                let _ = job.done.send(result);

                let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 1000 == 0 {
                    debug!(done, "requests finished");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fanline_common::Error;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct CountingHandler {
        holding: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingHandler {
        fn new() -> Self {
            Self {
                holding: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RequestHandler for CountingHandler {
        async fn handle(&self, request: Request, _forwarded: bool) -> Result<Reply> {
            let now = self.holding.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.holding.fetch_sub(1, Ordering::SeqCst);
            match request {
                Request::CreatePost { .. } => Ok(Reply::Success),
                _ => Err(Error::UnknownRequest),
            }
        }
    }

    fn create(timeline_id: i64) -> Request {
        Request::CreatePost {
            timeline_id,
            post_id: 1,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_jobs_from_all_sources_complete() {
        let handler = Arc::new(CountingHandler::new());
        let mut dispatcher = Dispatcher::new(Limiter::new(8), handler.clone());
        let first = dispatcher.source();
        let second = dispatcher.source();
        let loop_task = tokio::spawn(dispatcher.run());

        let mut completions = Vec::new();
        for i in 0..10 {
            let (job, rx) = Job::new(create(i), false);
            let source = if i % 2 == 0 { &first } else { &second };
            source.send(job).await.unwrap();
            completions.push(rx);
        }

        for rx in completions {
            let reply = rx.await.unwrap().unwrap();
            assert_eq!(reply, Reply::Success);
        }

        drop(first);
        drop(second);
        loop_task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_admission_bound_holds_under_burst() {
        const CAPACITY: usize = 3;
        let handler = Arc::new(CountingHandler::new());
        let mut dispatcher = Dispatcher::new(Limiter::new(CAPACITY), handler.clone());
        let source = dispatcher.source();
        let loop_task = tokio::spawn(dispatcher.run());

        let mut completions = Vec::new();
        for i in 0..30 {
            let (job, rx) = Job::new(create(i), false);
            source.send(job).await.unwrap();
            completions.push(rx);
        }
        for rx in completions {
            rx.await.unwrap().unwrap();
        }

        assert!(handler.peak.load(Ordering::SeqCst) <= CAPACITY);

        drop(source);
        loop_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_completion_carries_errors() {
        let handler = Arc::new(CountingHandler::new());
        let mut dispatcher = Dispatcher::new(Limiter::new(2), handler);
        let source = dispatcher.source();
        let loop_task = tokio::spawn(dispatcher.run());

        let (job, rx) = Job::new(
            Request::TimelineQuery {
                timeline_id: 1,
                before_post_id: 10,
                limit: 5,
            },
            false,
        );
        source.send(job).await.unwrap();
        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::UnknownRequest));

        drop(source);
        loop_task.await.unwrap();
    }
}
