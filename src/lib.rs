//! Session and event bridge for Muzik gesture-enabled headphones.
//!
//! The accessory speaks a delegate-style callback protocol with no request
//! correlation on the wire: one event stream carries battery results,
//! metadata, gestures, and sensor samples alike. This crate supplies the
//! missing structure:
//!
//! - [`session::AccessorySession`] owns the transport link, the one-shot
//!   request surface, and the correlation registry that routes each inbound
//!   response to the request that asked for it (or classifies it as
//!   unsolicited).
//! - [`event::AccessoryObserver`] is the single registered recipient of all
//!   events; [`bridge::HostBridge`] fans out to identifier-keyed host
//!   callback slots on top of it.
//! - [`gesture::store::GestureKeyStore`] persists user-defined
//!   gesture-to-action-key bindings across restarts.
//!
//! The physical radio link and the vendor wire protocol stay behind the
//! [`transport::AccessoryTransport`] seam.

pub mod bridge;
pub mod error;
pub mod event;
pub mod gesture;
pub mod protocol;
pub mod session;
pub mod transport;

pub use bridge::HostBridge;
pub use error::AccessoryError;
pub use event::{AccessoryEvent, AccessoryObserver, ObserverHandle};
pub use gesture::store::{
    FilePreferenceStore, GestureKeyStore, MemoryPreferenceStore, PreferenceStore,
};
pub use gesture::GestureType;
pub use protocol::{
    DeviceMetadata, RequestKind, ResponsePayload, SensorSample, TrackInfo, TransportCommand,
    TransportEvent,
};
pub use session::{AccessorySession, AuthorizationState, ConnectionState, SessionConfig};
pub use transport::{AccessoryTransport, TransportLink};
