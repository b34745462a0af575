// Latest-request-wins bookkeeping
// Callers that may fire several fetches for the same view (for example switching the
// selected driver while a fetch is in flight) tag each request with a ticket and only
// apply the response whose ticket is still the newest.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one dispatched request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Shared generation counter. Clones observe the same sequence.
#[derive(Clone, Debug, Default)]
pub struct RequestGeneration {
    latest: Arc<AtomicU64>,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new ticket, making every earlier ticket stale.
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Runs `apply` only if no newer request has been issued since `ticket`.
    pub fn apply_if_current<R>(
        &self,
        ticket: RequestTicket,
        apply: impl FnOnce() -> R,
    ) -> Option<R> {
        if self.is_current(ticket) {
            Some(apply())
        } else {
            log::debug!(
                "Discarding stale response for request {} (latest is {})",
                ticket.sequence(),
                self.latest.load(Ordering::Acquire)
            );
            None
        }
    }
}
