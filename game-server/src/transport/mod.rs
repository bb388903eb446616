//! C8 — Broadcast Transport. `post` pushes one payload to one connection
//! and classifies the failure so callers can decide whether to reap the
//! Connection row.

pub mod local;

use protocol::OutboundFrame;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PostError {
    /// The connection no longer exists on the transport.
    Gone,
    /// The connection exists but is not permitted to receive this (e.g.
    /// evicted, or the transport revoked it out of band).
    Forbidden,
    /// Anything else: network hiccup, throttling. Log and move on.
    Transient,
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, connection_id: &str, payload: &OutboundFrame) -> Result<(), PostError>;
}
