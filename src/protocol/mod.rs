//! Wire-facing types exchanged with the accessory transport.
//!
//! The transport decodes its vendor frames into these typed values exactly
//! once at the boundary; nothing downstream sees raw bytes or untyped
//! dictionaries.

use std::collections::HashMap;

/// One-shot request kinds with exactly one expected asynchronous response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    BatteryLevel,
    ChargeStatus,
    LocalName,
    ConnectedState,
    Metadata,
    TrackInfo,
    /// Single accelerometer read, distinct from the continuous stream.
    Accelerometer,
    /// Forced authorization status round trip.
    AuthStatus,
}

/// Commands sent down to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Issue a one-shot request; the response comes back as
    /// [`TransportEvent::Response`] with the same kind.
    Request(RequestKind),
    /// Send the developer credential for authorization.
    Authorize(String),
    /// Enable or disable press/hold and swipe gesture recognition.
    EnableGestures(bool),
    /// Toggle the continuous accelerometer receive buffer.
    SetAccelStream(bool),
}

/// Decoded payload of a one-shot response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    BatteryLevel(u8),
    ChargeStatus(bool),
    LocalName(String),
    ConnectedState(bool),
    Metadata(DeviceMetadata),
    TrackInfo(TrackInfo),
    Accelerometer(SensorSample),
}

impl ResponsePayload {
    /// The request kind this payload answers.
    pub fn kind(&self) -> RequestKind {
        match self {
            ResponsePayload::BatteryLevel(_) => RequestKind::BatteryLevel,
            ResponsePayload::ChargeStatus(_) => RequestKind::ChargeStatus,
            ResponsePayload::LocalName(_) => RequestKind::LocalName,
            ResponsePayload::ConnectedState(_) => RequestKind::ConnectedState,
            ResponsePayload::Metadata(_) => RequestKind::Metadata,
            ResponsePayload::TrackInfo(_) => RequestKind::TrackInfo,
            ResponsePayload::Accelerometer(_) => RequestKind::Accelerometer,
        }
    }
}

/// Everything the transport can report back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Physical attach/detach of the accessory.
    AttachChanged(bool),
    /// Logical connection up/down.
    ConnectionChanged(bool),
    /// Raw gesture identifier as recognized by the firmware.
    GestureRaw(crate::gesture::GestureType),
    /// Response to a one-shot request (or an unsolicited push of the same
    /// shape, when nothing is pending for the kind).
    Response(ResponsePayload),
    /// One sample from the continuous accelerometer stream.
    AccelSample(SensorSample),
    /// Authorization verdict, solicited or not.
    Authorization {
        authorized: bool,
        reason: Option<String>,
    },
}

/// One accelerometer reading. Short-valued on the wire; real devices stay
/// within a single byte of range per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Device version/manufacturer block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMetadata {
    pub software_version: String,
    pub hardware_version: String,
    pub manufacturer: String,
}

/// Currently playing track, as loosely structured key/value fields
/// (title, artist, album, ... — the firmware decides what it sends).
pub type TrackInfo = HashMap<String, String>;
