//! The seam between the session and the vendor accessory stack.
//!
//! The physical radio link, pairing, and the vendor's binary protocol all
//! live behind [`AccessoryTransport`]. A transport decodes vendor frames
//! into [`TransportEvent`]s once, at this boundary, and accepts typed
//! [`TransportCommand`]s; the session never sees wire bytes.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AccessoryError;
use crate::protocol::{TransportCommand, TransportEvent};

/// Channel pair produced by a successful connect: commands flow down the
/// sender, decoded callbacks come up the receiver. Dropping the sender (or
/// the transport closing the event side) ends the link.
pub struct TransportLink {
    pub commands: mpsc::Sender<TransportCommand>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Depth of the command/event channels for transports that want a default.
pub const LINK_CHANNEL_DEPTH: usize = 64;

/// Connection factory for an accessory transport.
#[async_trait]
pub trait AccessoryTransport: Send + Sync {
    /// Open the link to the accessory and start delivering decoded events.
    async fn connect(&mut self) -> Result<TransportLink, AccessoryError>;
}
