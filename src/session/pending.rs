//! Correlation registry for in-flight one-shot requests.
//!
//! The transport callback surface is not request-keyed: one event stream
//! carries every response kind. This table remembers which kinds have a
//! caller waiting, so an inbound response can be classified as correlated
//! (consume the entry) or unsolicited (leave the table alone).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::AccessoryError;
use crate::protocol::RequestKind;

/// One in-flight request.
#[derive(Debug, Clone, Copy)]
pub struct PendingRequest {
    pub kind: RequestKind,
    pub issued_at: Instant,
}

/// In-flight request table, at most one entry per kind.
///
/// A duplicate same-kind insert is rejected rather than overwritten:
/// overwriting would let the earlier response resolve against the later
/// caller's entry.
#[derive(Default)]
pub struct PendingRequests {
    inflight: HashMap<RequestKind, PendingRequest>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new in-flight request.
    pub fn insert(&mut self, kind: RequestKind) -> Result<(), AccessoryError> {
        self.insert_at(kind, Instant::now())
    }

    pub(crate) fn insert_at(
        &mut self,
        kind: RequestKind,
        issued_at: Instant,
    ) -> Result<(), AccessoryError> {
        if self.inflight.contains_key(&kind) {
            return Err(AccessoryError::RequestAlreadyPending(kind));
        }
        self.inflight.insert(kind, PendingRequest { kind, issued_at });
        Ok(())
    }

    /// Consume the entry for `kind`. Returns true when a request was
    /// actually pending, i.e. the response is correlated.
    pub fn resolve(&mut self, kind: RequestKind) -> bool {
        self.inflight.remove(&kind).is_some()
    }

    /// Drop every entry, returning the cancelled kinds.
    pub fn cancel_all(&mut self) -> Vec<RequestKind> {
        let kinds: Vec<RequestKind> = self.inflight.keys().copied().collect();
        if !kinds.is_empty() {
            debug!("Cancelling {} pending request(s)", kinds.len());
        }
        self.inflight.clear();
        kinds
    }

    /// Drop entries older than `timeout`, returning the expired kinds.
    pub fn expire(&mut self, timeout: Duration) -> Vec<RequestKind> {
        let now = Instant::now();
        let expired: Vec<RequestKind> = self
            .inflight
            .values()
            .filter(|p| now.duration_since(p.issued_at) >= timeout)
            .map(|p| p.kind)
            .collect();
        for kind in &expired {
            debug!("Request {:?} timed out", kind);
            self.inflight.remove(kind);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}
