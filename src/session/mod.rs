pub mod auth;
pub mod pending;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AccessoryError;
use crate::event::{AccessoryEvent, ObserverHandle};
use crate::gesture::store::GestureKeyStore;
use crate::gesture::GestureType;
use crate::protocol::{RequestKind, TransportCommand, TransportEvent};
use crate::transport::AccessoryTransport;
use auth::AuthGate;
pub use auth::AuthorizationState;
use pending::PendingRequests;

/// Connection lifecycle, driven only by transport notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Detached,
    Attached,
    Connected,
}

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pending requests older than this are cancelled. The source protocol
    /// has no timeout at all; without one a swallowed response would leak
    /// its table entry forever.
    pub request_timeout: Duration,
    /// How often the sweep task looks for stale pendings.
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

/// Everything shared between caller-initiated requests and transport
/// callbacks. One lock owns all of it; it is never held across an await.
struct SessionState {
    connection: ConnectionState,
    auth: AuthGate,
    /// Set after a reported detach/disconnect; requests fail fast until the
    /// transport reports reconnection.
    link_lost: bool,
    accel_stream: bool,
    observer: Option<ObserverHandle>,
    pending: PendingRequests,
    commands: Option<mpsc::Sender<TransportCommand>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            connection: ConnectionState::Detached,
            auth: AuthGate::new(),
            link_lost: false,
            accel_stream: false,
            observer: None,
            pending: PendingRequests::new(),
            commands: None,
        }
    }
}

/// Owns the accessory connection: the one-shot request surface, the sensor
/// stream toggle, the correlation registry, and single-observer event
/// dispatch. One session per accessory; lifecycle is explicit
/// (`new` / `initialize` / `teardown`).
pub struct AccessorySession {
    transport: Box<dyn AccessoryTransport>,
    state: Arc<Mutex<SessionState>>,
    keystore: Arc<GestureKeyStore>,
    config: SessionConfig,
    pump_task: Option<JoinHandle<()>>,
    sweep_task: Option<JoinHandle<()>>,
}

impl AccessorySession {
    pub fn new(transport: Box<dyn AccessoryTransport>, keystore: Arc<GestureKeyStore>) -> Self {
        Self::with_config(transport, keystore, SessionConfig::default())
    }

    pub fn with_config(
        transport: Box<dyn AccessoryTransport>,
        keystore: Arc<GestureKeyStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(SessionState::new())),
            keystore,
            config,
            pump_task: None,
            sweep_task: None,
        }
    }

    /// Register the observer that receives all accessory events, replacing
    /// any previous one. No event reaches a replaced observer after this
    /// returns.
    pub fn register_observer(&self, observer: ObserverHandle) {
        let mut st = self.state.lock().unwrap();
        st.observer = Some(observer);
    }

    /// Remove the observer. Subsequent events are dropped, not buffered.
    pub fn unregister_observer(&self) {
        let mut st = self.state.lock().unwrap();
        st.observer = None;
    }

    /// Open the transport, start the callback engine, enable gesture and
    /// swipe detection, and request the initial connection/metadata burst.
    ///
    /// Burst results arrive only through the observer; register one first
    /// or they are dropped.
    pub async fn initialize(&mut self) -> Result<(), AccessoryError> {
        let link = self.transport.connect().await?;
        info!("Accessory transport connected");

        {
            let mut st = self.state.lock().unwrap();
            st.commands = Some(link.commands.clone());
            st.link_lost = false;
        }

        let pump_state = Arc::clone(&self.state);
        let pump_keystore = Arc::clone(&self.keystore);
        let mut events = link.events;
        self.pump_task = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                process_event(&pump_state, &pump_keystore, event);
            }
            on_event_channel_closed(&pump_state);
        }));

        let sweep_state = Arc::clone(&self.state);
        let timeout = self.config.request_timeout;
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        self.sweep_task = Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let st = &mut *sweep_state.lock().unwrap();
                for kind in st.pending.expire(timeout) {
                    warn!("Request {:?} timed out, cancelling", kind);
                    dispatch(st, AccessoryEvent::RequestCancelled(kind));
                }
            }
        }));

        if link
            .commands
            .send(TransportCommand::EnableGestures(true))
            .await
            .is_err()
        {
            return Err(AccessoryError::TransportDisconnected);
        }

        // Initial burst: connection status plus version/manufacturer info.
        // No observer precondition here; with none registered the results
        // are simply dropped.
        for kind in [RequestKind::ConnectedState, RequestKind::Metadata] {
            if let Err(e) = self.issue_request(kind, false).await {
                warn!("Initial {:?} request failed: {}", kind, e);
            }
        }

        Ok(())
    }

    /// Tear the session down: cancel every pending request, stop the pump
    /// and sweep tasks, drop the command channel.
    pub fn teardown(&mut self) {
        if let Some(task) = self.pump_task.take() {
            task.abort();
        }
        if let Some(task) = self.sweep_task.take() {
            task.abort();
        }
        let st = &mut *self.state.lock().unwrap();
        st.commands = None;
        st.link_lost = true;
        st.accel_stream = false;
        for kind in st.pending.cancel_all() {
            dispatch(st, AccessoryEvent::RequestCancelled(kind));
        }
        info!("Accessory session torn down");
    }

    /// Send the developer credential. The verdict arrives asynchronously as
    /// an `AuthorizationResult` event and updates the cached gate state.
    pub async fn authorize_dev_with_key(&self, key: &str) -> Result<(), AccessoryError> {
        let commands = self.commands()?;
        commands
            .send(TransportCommand::Authorize(key.to_string()))
            .await
            .map_err(|_| AccessoryError::TransportDisconnected)
    }

    /// Cached authorization answer. A negative answer additionally emits one
    /// `AuthorizationResult(false, reason)` event to the observer, so the
    /// synchronous `false` always comes with its asynchronous explanation.
    pub fn check_is_authorized(&self) -> bool {
        let st = self.state.lock().unwrap();
        if st.auth.is_authorized() {
            return true;
        }
        let reason = st.auth.denial_reason();
        dispatch(
            &st,
            AccessoryEvent::AuthorizationResult {
                authorized: false,
                reason: Some(reason),
            },
        );
        false
    }

    /// Force a fresh authorization round trip regardless of the cache.
    pub async fn request_is_dev_authorized(&self) -> Result<(), AccessoryError> {
        self.issue_request(RequestKind::AuthStatus, true).await
    }

    pub async fn request_battery_level(&self) -> Result<(), AccessoryError> {
        self.issue_request(RequestKind::BatteryLevel, true).await
    }

    pub async fn request_charge_status(&self) -> Result<(), AccessoryError> {
        self.issue_request(RequestKind::ChargeStatus, true).await
    }

    pub async fn request_local_name(&self) -> Result<(), AccessoryError> {
        self.issue_request(RequestKind::LocalName, true).await
    }

    pub async fn request_connected_state(&self) -> Result<(), AccessoryError> {
        self.issue_request(RequestKind::ConnectedState, true).await
    }

    pub async fn request_metadata(&self) -> Result<(), AccessoryError> {
        self.issue_request(RequestKind::Metadata, true).await
    }

    pub async fn request_track_info(&self) -> Result<(), AccessoryError> {
        self.issue_request(RequestKind::TrackInfo, true).await
    }

    /// One-shot accelerometer read, distinct from the continuous stream.
    pub async fn request_accelerometer_data(&self) -> Result<(), AccessoryError> {
        self.issue_request(RequestKind::Accelerometer, true).await
    }

    /// Toggle the continuous accelerometer stream. Turning it on requires
    /// authorization; turning it off always succeeds locally and no sample
    /// is delivered after the call returns.
    pub async fn set_accelerometer_stream(&self, on: bool) -> Result<(), AccessoryError> {
        let (changed, commands) = {
            let mut st = self.state.lock().unwrap();
            if on && !st.auth.is_authorized() {
                return Err(AccessoryError::NotAuthorized);
            }
            let changed = st.accel_stream != on;
            st.accel_stream = on;
            (changed, st.commands.clone())
        };
        if !changed {
            return Ok(());
        }
        match commands {
            Some(commands) => {
                if commands
                    .send(TransportCommand::SetAccelStream(on))
                    .await
                    .is_err()
                    && on
                {
                    return Err(AccessoryError::TransportDisconnected);
                }
            }
            // Local gating already stops delivery; only enabling needs the
            // transport.
            None if on => return Err(AccessoryError::TransportDisconnected),
            None => {}
        }
        Ok(())
    }

    /// Bind an application action key to a gesture type. Local and
    /// synchronous; no transport round trip.
    pub fn set_gesture_action_key(
        &self,
        gesture: GestureType,
        key: u32,
    ) -> Result<(), AccessoryError> {
        self.keystore.set_binding(gesture, key)
    }

    /// Last bound action key for a gesture type, or `None` when unbound.
    pub fn get_gesture_action_key(&self, gesture: GestureType) -> Option<u32> {
        self.keystore.get_binding(gesture)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.lock().unwrap().connection
    }

    pub fn authorization_state(&self) -> AuthorizationState {
        self.state.lock().unwrap().auth.state().clone()
    }

    fn commands(&self) -> Result<mpsc::Sender<TransportCommand>, AccessoryError> {
        let st = self.state.lock().unwrap();
        if st.link_lost {
            return Err(AccessoryError::TransportDisconnected);
        }
        st.commands
            .clone()
            .ok_or(AccessoryError::TransportDisconnected)
    }

    /// Register a pending entry and forward the request. The entry is
    /// committed before the send; a failed send rolls it back.
    async fn issue_request(
        &self,
        kind: RequestKind,
        require_observer: bool,
    ) -> Result<(), AccessoryError> {
        let commands = {
            let mut st = self.state.lock().unwrap();
            if require_observer && st.observer.is_none() {
                return Err(AccessoryError::NoObserverRegistered);
            }
            if st.link_lost {
                return Err(AccessoryError::TransportDisconnected);
            }
            let commands = st
                .commands
                .clone()
                .ok_or(AccessoryError::TransportDisconnected)?;
            st.pending.insert(kind)?;
            commands
        };
        if commands
            .send(TransportCommand::Request(kind))
            .await
            .is_err()
        {
            let mut st = self.state.lock().unwrap();
            st.pending.resolve(kind);
            return Err(AccessoryError::TransportDisconnected);
        }
        debug!("Issued {:?} request", kind);
        Ok(())
    }

    #[cfg(test)]
    fn inject_event(&self, event: TransportEvent) {
        process_event(&self.state, &self.keystore, event);
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }
}

impl Drop for AccessorySession {
    fn drop(&mut self) {
        if let Some(task) = self.pump_task.take() {
            task.abort();
        }
        if let Some(task) = self.sweep_task.take() {
            task.abort();
        }
    }
}

/// Deliver one event to the current observer, or drop it.
fn dispatch(st: &SessionState, event: AccessoryEvent) {
    match &st.observer {
        Some(observer) => observer.on_event(event),
        None => debug!("No observer registered, dropping {:?}", event),
    }
}

fn cancel_all_pending(st: &mut SessionState) {
    for kind in st.pending.cancel_all() {
        dispatch(st, AccessoryEvent::RequestCancelled(kind));
    }
}

/// Classify and route one transport callback. Runs on the pump task, under
/// the same lock the request surface uses, so ordering follows transport
/// arrival order and a replaced observer can never receive a late event.
fn process_event(
    state: &Mutex<SessionState>,
    keystore: &GestureKeyStore,
    event: TransportEvent,
) {
    let st = &mut *state.lock().unwrap();
    match event {
        TransportEvent::AttachChanged(attached) => {
            st.connection = if attached {
                ConnectionState::Attached
            } else {
                ConnectionState::Detached
            };
            if !attached {
                st.link_lost = true;
                cancel_all_pending(st);
            }
            info!("Accessory {}", if attached { "attached" } else { "detached" });
            dispatch(st, AccessoryEvent::AttachChanged(attached));
        }
        TransportEvent::ConnectionChanged(connected) => {
            if connected {
                st.connection = ConnectionState::Connected;
                st.link_lost = false;
            } else {
                if st.connection == ConnectionState::Connected {
                    st.connection = ConnectionState::Attached;
                }
                st.link_lost = true;
                cancel_all_pending(st);
            }
            info!("Accessory {}", if connected { "connected" } else { "disconnected" });
            dispatch(st, AccessoryEvent::ConnectionChanged(connected));
        }
        TransportEvent::GestureRaw(gesture) => {
            let action_key = keystore.resolve(gesture);
            debug!("Gesture {} -> action key {}", gesture, action_key);
            dispatch(st, AccessoryEvent::GestureReceived { action_key });
        }
        TransportEvent::Response(payload) => {
            let kind = payload.kind();
            if st.pending.resolve(kind) {
                debug!("Correlated {:?} response", kind);
            } else {
                debug!("Unsolicited {:?} update", kind);
            }
            dispatch(st, AccessoryEvent::from_response(payload));
        }
        TransportEvent::AccelSample(sample) => {
            if st.accel_stream {
                dispatch(st, AccessoryEvent::SensorSample(sample));
            } else {
                debug!("Accelerometer stream off, dropping sample");
            }
        }
        TransportEvent::Authorization { authorized, reason } => {
            st.auth.apply_result(authorized, reason.clone());
            st.pending.resolve(RequestKind::AuthStatus);
            dispatch(
                st,
                AccessoryEvent::AuthorizationResult { authorized, reason },
            );
        }
    }
}

/// The transport dropped its event side without a disconnect notification.
fn on_event_channel_closed(state: &Mutex<SessionState>) {
    let st = &mut *state.lock().unwrap();
    if st.commands.is_some() {
        warn!("Transport event channel closed, treating as link loss");
        st.commands = None;
        st.link_lost = true;
        st.connection = ConnectionState::Detached;
        cancel_all_pending(st);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AccessoryObserver;
    use crate::gesture::store::MemoryPreferenceStore;
    use crate::protocol::{DeviceMetadata, ResponsePayload, SensorSample};
    use crate::transport::TransportLink;
    use async_trait::async_trait;

    /// Transport fake: the test keeps the far end of both channels.
    struct FakeTransport {
        link: Option<TransportLink>,
    }

    struct FakeRemote {
        events: mpsc::Sender<TransportEvent>,
        commands: mpsc::Receiver<TransportCommand>,
    }

    fn fake_transport() -> (FakeTransport, FakeRemote) {
        let (command_tx, command_rx) = mpsc::channel(crate::transport::LINK_CHANNEL_DEPTH);
        let (event_tx, event_rx) = mpsc::channel(crate::transport::LINK_CHANNEL_DEPTH);
        (
            FakeTransport {
                link: Some(TransportLink {
                    commands: command_tx,
                    events: event_rx,
                }),
            },
            FakeRemote {
                events: event_tx,
                commands: command_rx,
            },
        )
    }

    #[async_trait]
    impl AccessoryTransport for FakeTransport {
        async fn connect(&mut self) -> Result<TransportLink, AccessoryError> {
            Ok(self.link.take().expect("connect called twice"))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<AccessoryEvent>>,
    }

    impl RecordingObserver {
        fn recorded(&self) -> Vec<AccessoryEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl AccessoryObserver for RecordingObserver {
        fn on_event(&self, event: AccessoryEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    async fn connected_session() -> (AccessorySession, FakeRemote, Arc<RecordingObserver>) {
        let (transport, mut remote) = fake_transport();
        let keystore = Arc::new(GestureKeyStore::new(Box::new(MemoryPreferenceStore::new())));
        let mut session = AccessorySession::new(Box::new(transport), keystore);
        session.initialize().await.unwrap();

        // Drain the init traffic: gesture enable + connection/metadata burst.
        assert_eq!(
            remote.commands.recv().await,
            Some(TransportCommand::EnableGestures(true))
        );
        assert_eq!(
            remote.commands.recv().await,
            Some(TransportCommand::Request(RequestKind::ConnectedState))
        );
        assert_eq!(
            remote.commands.recv().await,
            Some(TransportCommand::Request(RequestKind::Metadata))
        );
        session.inject_event(TransportEvent::Response(ResponsePayload::ConnectedState(
            true,
        )));
        session.inject_event(TransportEvent::Response(ResponsePayload::Metadata(
            DeviceMetadata {
                software_version: "2.0".into(),
                hardware_version: "1.1".into(),
                manufacturer: "Muzik".into(),
            },
        )));
        assert_eq!(session.pending_len(), 0);

        let observer = Arc::new(RecordingObserver::default());
        session.register_observer(observer.clone());
        (session, remote, observer)
    }

    fn authorize(session: &AccessorySession) {
        session.inject_event(TransportEvent::Authorization {
            authorized: true,
            reason: None,
        });
    }

    #[tokio::test]
    async fn test_request_requires_observer() {
        let (session, _remote, _observer) = connected_session().await;
        session.unregister_observer();
        let err = session.request_battery_level().await.unwrap_err();
        assert!(matches!(err, AccessoryError::NoObserverRegistered));
        assert_eq!(session.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_observer_replacement_excludes_old() {
        let (session, _remote, observer_a) = connected_session().await;
        let observer_b = Arc::new(RecordingObserver::default());
        session.register_observer(observer_b.clone());

        session.inject_event(TransportEvent::GestureRaw(GestureType::Tap12));

        assert!(observer_a.recorded().is_empty());
        assert_eq!(
            observer_b.recorded(),
            vec![AccessoryEvent::GestureReceived {
                action_key: GestureType::Tap12.raw_index()
            }]
        );
    }

    #[tokio::test]
    async fn test_battery_response_correlates_once() {
        let (session, mut remote, observer) = connected_session().await;

        session.request_battery_level().await.unwrap();
        assert_eq!(
            remote.commands.recv().await,
            Some(TransportCommand::Request(RequestKind::BatteryLevel))
        );
        assert_eq!(session.pending_len(), 1);

        session.inject_event(TransportEvent::Response(ResponsePayload::BatteryLevel(82)));
        assert_eq!(session.pending_len(), 0);
        assert_eq!(observer.recorded(), vec![AccessoryEvent::BatteryLevel(82)]);

        // Same-kind response with nothing pending: unsolicited update, no
        // pending entry consumed.
        session.inject_event(TransportEvent::Response(ResponsePayload::BatteryLevel(81)));
        assert_eq!(session.pending_len(), 0);
        assert_eq!(
            observer.recorded(),
            vec![
                AccessoryEvent::BatteryLevel(82),
                AccessoryEvent::BatteryLevel(81)
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_request_rejected() {
        let (session, _remote, _observer) = connected_session().await;
        session.request_track_info().await.unwrap();
        let err = session.request_track_info().await.unwrap_err();
        assert!(matches!(
            err,
            AccessoryError::RequestAlreadyPending(RequestKind::TrackInfo)
        ));
        assert_eq!(session.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_cancels_all_pending() {
        let (session, _remote, observer) = connected_session().await;
        session.request_battery_level().await.unwrap();
        session.request_local_name().await.unwrap();
        assert_eq!(session.pending_len(), 2);

        session.inject_event(TransportEvent::ConnectionChanged(false));
        assert_eq!(session.pending_len(), 0);

        let recorded = observer.recorded();
        let cancelled: Vec<_> = recorded
            .iter()
            .filter(|e| matches!(e, AccessoryEvent::RequestCancelled(_)))
            .collect();
        assert_eq!(cancelled.len(), 2);
        assert!(recorded.contains(&AccessoryEvent::ConnectionChanged(false)));

        // Fail fast until the transport reports reconnection.
        let err = session.request_battery_level().await.unwrap_err();
        assert!(matches!(err, AccessoryError::TransportDisconnected));

        // A late response finds no stale entry to resolve against.
        session.inject_event(TransportEvent::Response(ResponsePayload::BatteryLevel(50)));
        assert_eq!(session.pending_len(), 0);

        // Reconnection reopens the request surface.
        session.inject_event(TransportEvent::ConnectionChanged(true));
        session.request_battery_level().await.unwrap();
    }

    #[tokio::test]
    async fn test_detach_cancels_and_fails_fast() {
        let (session, _remote, observer) = connected_session().await;
        session.request_metadata().await.unwrap();

        session.inject_event(TransportEvent::AttachChanged(false));
        assert_eq!(session.connection_state(), ConnectionState::Detached);
        assert_eq!(session.pending_len(), 0);
        assert!(observer
            .recorded()
            .contains(&AccessoryEvent::RequestCancelled(RequestKind::Metadata)));

        let err = session.request_metadata().await.unwrap_err();
        assert!(matches!(err, AccessoryError::TransportDisconnected));
    }

    #[tokio::test]
    async fn test_check_is_authorized_double_channel() {
        let (session, _remote, observer) = connected_session().await;

        assert!(!session.check_is_authorized());
        let recorded = observer.recorded();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(
            recorded[0],
            AccessoryEvent::AuthorizationResult {
                authorized: false,
                reason: Some(_)
            }
        ));

        authorize(&session);
        assert!(session.check_is_authorized());
        // Positive answer is synchronous only: the auth verdict event plus
        // the earlier negative one, nothing more.
        assert_eq!(observer.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_authorization_verdict_updates_gate() {
        let (session, _remote, observer) = connected_session().await;

        session.inject_event(TransportEvent::Authorization {
            authorized: false,
            reason: Some("unknown developer key".into()),
        });
        assert_eq!(
            session.authorization_state(),
            AuthorizationState::Error("unknown developer key".into())
        );

        authorize(&session);
        assert_eq!(session.authorization_state(), AuthorizationState::Authorized);
        assert_eq!(
            observer.recorded(),
            vec![
                AccessoryEvent::AuthorizationResult {
                    authorized: false,
                    reason: Some("unknown developer key".into()),
                },
                AccessoryEvent::AuthorizationResult {
                    authorized: true,
                    reason: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_sensor_stream_gating() {
        let (session, mut remote, observer) = connected_session().await;
        authorize(&session);

        session.set_accelerometer_stream(true).await.unwrap();
        assert_eq!(
            remote.commands.recv().await,
            Some(TransportCommand::SetAccelStream(true))
        );

        let samples = [
            SensorSample { x: 1, y: 2, z: 3 },
            SensorSample { x: 4, y: 5, z: 6 },
            SensorSample { x: 7, y: 8, z: 9 },
        ];
        for s in samples {
            session.inject_event(TransportEvent::AccelSample(s));
        }

        // Arrival order preserved; auth verdict came first.
        let recorded = observer.recorded();
        let delivered: Vec<_> = recorded
            .iter()
            .filter_map(|e| match e {
                AccessoryEvent::SensorSample(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(delivered, samples.to_vec());

        session.set_accelerometer_stream(false).await.unwrap();
        session.inject_event(TransportEvent::AccelSample(SensorSample {
            x: 9,
            y: 9,
            z: 9,
        }));
        assert_eq!(
            observer
                .recorded()
                .iter()
                .filter(|e| matches!(e, AccessoryEvent::SensorSample(_)))
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn test_stream_enable_requires_authorization() {
        let (session, _remote, _observer) = connected_session().await;
        let err = session.set_accelerometer_stream(true).await.unwrap_err();
        assert!(matches!(err, AccessoryError::NotAuthorized));
        // Toggling off while unauthorized is tolerated.
        session.set_accelerometer_stream(false).await.unwrap();
    }

    #[tokio::test]
    async fn test_gesture_binding_resolution() {
        let (session, _remote, observer) = connected_session().await;

        session
            .set_gesture_action_key(GestureType::SwipeForward, 4040)
            .unwrap();
        assert_eq!(
            session.get_gesture_action_key(GestureType::SwipeForward),
            Some(4040)
        );

        session.inject_event(TransportEvent::GestureRaw(GestureType::SwipeForward));
        session.inject_event(TransportEvent::GestureRaw(GestureType::Tap6));

        assert_eq!(
            observer.recorded(),
            vec![
                AccessoryEvent::GestureReceived { action_key: 4040 },
                AccessoryEvent::GestureReceived {
                    action_key: GestureType::Tap6.raw_index()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_teardown_cancels_pending() {
        let (mut session, _remote, observer) = connected_session().await;
        session.request_charge_status().await.unwrap();

        session.teardown();
        assert!(observer
            .recorded()
            .contains(&AccessoryEvent::RequestCancelled(RequestKind::ChargeStatus)));

        let err = session.request_charge_status().await.unwrap_err();
        assert!(matches!(err, AccessoryError::TransportDisconnected));
    }

    #[tokio::test]
    async fn test_pump_delivers_through_channel() {
        let (session, remote, observer) = connected_session().await;

        remote
            .events
            .send(TransportEvent::GestureRaw(GestureType::TwoFingerTap))
            .await
            .unwrap();
        remote
            .events
            .send(TransportEvent::Response(ResponsePayload::LocalName(
                "Muzik One".into(),
            )))
            .await
            .unwrap();

        // The pump runs on its own task; poll until both events land.
        for _ in 0..100 {
            if observer.recorded().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            observer.recorded(),
            vec![
                AccessoryEvent::GestureReceived {
                    action_key: GestureType::TwoFingerTap.raw_index()
                },
                AccessoryEvent::LocalName("Muzik One".into()),
            ]
        );
        drop(session);
    }

    #[tokio::test]
    async fn test_request_timeout_sweep() {
        let (transport, mut remote) = fake_transport();
        let keystore = Arc::new(GestureKeyStore::new(Box::new(MemoryPreferenceStore::new())));
        let mut session = AccessorySession::with_config(
            Box::new(transport),
            keystore,
            SessionConfig {
                request_timeout: Duration::from_millis(50),
                sweep_interval: Duration::from_millis(10),
            },
        );
        session.initialize().await.unwrap();
        let observer = Arc::new(RecordingObserver::default());
        session.register_observer(observer.clone());

        // The init burst itself goes stale and gets swept; drain commands so
        // sends don't block.
        tokio::spawn(async move { while remote.commands.recv().await.is_some() {} });

        session.request_battery_level().await.unwrap();
        for _ in 0..100 {
            if session.pending_len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(session.pending_len(), 0);
        assert!(observer
            .recorded()
            .contains(&AccessoryEvent::RequestCancelled(RequestKind::BatteryLevel)));
    }
}
