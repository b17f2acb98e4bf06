//! Host-application fan-out over the single-observer core.
//!
//! The session delivers every event to exactly one observer. Host
//! applications usually want several independent callback slots instead
//! ("tell me about gestures here, battery there"), each tagged with an
//! opaque identifier the host picked at registration time. The bridge owns
//! that identifier-keyed table so the core never has to bend its
//! one-observer rule.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};
use tracing::debug;

use crate::event::{AccessoryEvent, AccessoryObserver};

/// Slot names, one per event kind.
pub mod slots {
    pub const ATTACH_CHANGED: &str = "attach_changed";
    pub const CONNECTION_CHANGED: &str = "connection_changed";
    pub const GESTURE_RECEIVED: &str = "gesture_received";
    pub const BATTERY_LEVEL: &str = "battery_level";
    pub const CHARGE_STATUS: &str = "charge_status";
    pub const LOCAL_NAME: &str = "local_name";
    pub const METADATA: &str = "metadata";
    pub const SENSOR_SAMPLE: &str = "sensor_sample";
    pub const AUTHORIZATION_RESULT: &str = "authorization_result";
    pub const TRACK_INFO: &str = "track_info";
    pub const REQUEST_CANCELLED: &str = "request_cancelled";
}

/// Host callback: receives the opaque registration id and a JSON payload.
pub type SlotCallback = Box<dyn Fn(&str, Value) + Send + Sync>;

struct CallbackSlot {
    id: String,
    callback: SlotCallback,
}

/// Identifier-keyed callback table. Registering a slot again replaces it;
/// events for unregistered slots are dropped.
#[derive(Default)]
pub struct HostBridge {
    slots: Mutex<HashMap<String, CallbackSlot>>,
}

impl HostBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for a slot, keyed by a host-chosen opaque id.
    pub fn register_callback(
        &self,
        slot: impl Into<String>,
        id: impl Into<String>,
        callback: SlotCallback,
    ) {
        let mut slots = self.slots.lock().unwrap();
        slots.insert(
            slot.into(),
            CallbackSlot {
                id: id.into(),
                callback,
            },
        );
    }

    /// The opaque id registered for a slot, if any.
    pub fn callback_id(&self, slot: &str) -> Option<String> {
        self.slots.lock().unwrap().get(slot).map(|s| s.id.clone())
    }

    pub fn unregister_callback(&self, slot: &str) {
        self.slots.lock().unwrap().remove(slot);
    }

    fn deliver(&self, slot: &str, payload: Value) {
        let slots = self.slots.lock().unwrap();
        match slots.get(slot) {
            Some(entry) => (entry.callback)(&entry.id, payload),
            None => debug!("No callback for slot {:?}, dropping", slot),
        }
    }
}

impl AccessoryObserver for HostBridge {
    fn on_event(&self, event: AccessoryEvent) {
        let (slot, payload) = encode(event);
        self.deliver(slot, payload);
    }
}

/// Map an event to its slot and an application-visible JSON payload.
fn encode(event: AccessoryEvent) -> (&'static str, Value) {
    match event {
        AccessoryEvent::AttachChanged(attached) => {
            (slots::ATTACH_CHANGED, json!({ "attached": attached }))
        }
        AccessoryEvent::ConnectionChanged(connected) => {
            (slots::CONNECTION_CHANGED, json!({ "connected": connected }))
        }
        AccessoryEvent::GestureReceived { action_key } => {
            (slots::GESTURE_RECEIVED, json!({ "action_key": action_key }))
        }
        AccessoryEvent::BatteryLevel(percent) => {
            (slots::BATTERY_LEVEL, json!({ "percent": percent }))
        }
        AccessoryEvent::ChargeStatus(charging) => {
            (slots::CHARGE_STATUS, json!({ "charging": charging }))
        }
        AccessoryEvent::LocalName(name) => (slots::LOCAL_NAME, json!({ "name": name })),
        AccessoryEvent::Metadata(meta) => (
            slots::METADATA,
            json!({
                "software_version": meta.software_version,
                "hardware_version": meta.hardware_version,
                "manufacturer": meta.manufacturer,
            }),
        ),
        AccessoryEvent::SensorSample(sample) => (
            slots::SENSOR_SAMPLE,
            json!({ "x": sample.x, "y": sample.y, "z": sample.z }),
        ),
        AccessoryEvent::AuthorizationResult { authorized, reason } => (
            slots::AUTHORIZATION_RESULT,
            json!({ "authorized": authorized, "reason": reason }),
        ),
        AccessoryEvent::TrackInfo(info) => (slots::TRACK_INFO, json!(info)),
        AccessoryEvent::RequestCancelled(kind) => (
            slots::REQUEST_CANCELLED,
            json!({ "kind": format!("{:?}", kind) }),
        ),
    }
}
