use thiserror::Error;

use crate::protocol::RequestKind;

/// Errors surfaced synchronously by the accessory API.
///
/// Everything transport-dependent is reported asynchronously through the
/// observer instead; these cover local precondition failures and the
/// fail-fast paths.
#[derive(Debug, Error)]
pub enum AccessoryError {
    /// Operation requires an authorized session.
    #[error("accessory API is not authorized")]
    NotAuthorized,

    /// A one-shot request was issued with no observer to receive its result.
    #[error("no observer registered to receive the response")]
    NoObserverRegistered,

    /// A request of this kind is already in flight.
    #[error("request already pending: {0:?}")]
    RequestAlreadyPending(RequestKind),

    /// The transport reported detachment or disconnection.
    #[error("accessory transport is disconnected")]
    TransportDisconnected,

    /// Binding or lookup for a gesture type string we don't recognize.
    #[error("invalid gesture type: {0:?}")]
    InvalidGestureType(String),

    /// The durable preference store failed to persist a binding.
    #[error("preference store error: {0}")]
    Store(#[from] anyhow::Error),
}
