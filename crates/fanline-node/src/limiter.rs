//! Admission limiter bounding concurrent request tasks.
//!
//! Every admitted unit of work holds one slot from a fixed pool for its
//! whole lifetime, so the storage engine and peer fan-out never see more
//! than `capacity` concurrent requests no matter how many sources feed the
//! dispatcher. When every slot is held by tasks blocked on a slow peer, the
//! whole node stops admitting new work from any source until a slot frees —
//! a known property of the bounded-capacity design, left observable through
//! [`Limiter::available`] rather than papered over with timeouts.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate with a fixed number of slots.
#[derive(Clone)]
pub struct Limiter {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// One reserved slot. The slot is returned when the permit drops, so
/// acquire/release pairing holds on every exit path by construction.
pub struct Permit {
    _slot: OwnedSemaphorePermit,
}

impl Limiter {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot and reserve it.
    pub async fn admit(&self) -> Permit {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .expect("limiter semaphore closed");
        Permit { _slot: slot }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}
