//! Events emitted by the accessory session.

use std::sync::Arc;

use crate::protocol::{DeviceMetadata, RequestKind, ResponsePayload, SensorSample, TrackInfo};

/// Everything the session can report to its observer: unsolicited
/// notifications and correlated one-shot results alike, in transport
/// arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessoryEvent {
    /// Accessory physically attached or detached.
    AttachChanged(bool),
    /// Logical connection came up or went down.
    ConnectionChanged(bool),
    /// A gesture fired; `action_key` is the user's binding for the gesture
    /// type, or the raw gesture index when unbound.
    GestureReceived { action_key: u32 },
    /// Battery percentage, 0–100.
    BatteryLevel(u8),
    ChargeStatus(bool),
    /// Bluetooth local broadcast name.
    LocalName(String),
    Metadata(DeviceMetadata),
    SensorSample(SensorSample),
    AuthorizationResult {
        authorized: bool,
        reason: Option<String>,
    },
    TrackInfo(TrackInfo),
    /// A pending request was cancelled: link loss, teardown, or timeout.
    RequestCancelled(RequestKind),
}

impl AccessoryEvent {
    /// Lift a decoded one-shot response payload into its event.
    pub(crate) fn from_response(payload: ResponsePayload) -> Self {
        match payload {
            ResponsePayload::BatteryLevel(pct) => AccessoryEvent::BatteryLevel(pct),
            ResponsePayload::ChargeStatus(charging) => AccessoryEvent::ChargeStatus(charging),
            ResponsePayload::LocalName(name) => AccessoryEvent::LocalName(name),
            ResponsePayload::ConnectedState(connected) => {
                AccessoryEvent::ConnectionChanged(connected)
            }
            ResponsePayload::Metadata(meta) => AccessoryEvent::Metadata(meta),
            ResponsePayload::TrackInfo(info) => AccessoryEvent::TrackInfo(info),
            ResponsePayload::Accelerometer(sample) => AccessoryEvent::SensorSample(sample),
        }
    }
}

/// Recipient of accessory events.
///
/// The session holds at most one observer at a time; registering a new one
/// replaces the previous atomically. Fan-out to multiple application
/// callbacks belongs in [`crate::bridge::HostBridge`], not here.
pub trait AccessoryObserver: Send + Sync {
    fn on_event(&self, event: AccessoryEvent);
}

/// Shared observer handle.
pub type ObserverHandle = Arc<dyn AccessoryObserver>;
