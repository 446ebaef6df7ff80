// Copyright (c) 2024-2025 The dmk developers

//! Device sessions
//!
//! A [DeviceSession] pairs one open [DeviceConnection] with the state a
//! consumer observes about the device behind it (reachability, running
//! application, battery). Sessions serialise all exchanges, run the
//! background [refresher](RefresherOptions) and push every state change to
//! subscribers until closed.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use log::{debug, trace, warn};
use rand::Rng;
use tokio::{
    sync::{watch, Mutex as AsyncMutex},
    task::JoinHandle,
};

use dmk_apdu::ApduResponse;

use crate::{
    action::{run_action, DeviceAction, DeviceActionHandle},
    command::{os::GetAppAndVersionCommand, Command, CommandResult},
    device::ConnectedDevice,
    error::TransportError,
    transport::DeviceConnection,
};

mod refresher;
mod registry;
mod state;

pub use refresher::{RefresherOptions, MIN_POLLING_INTERVAL};
pub use registry::SessionRegistry;
pub use state::{DeviceSessionState, DeviceStatus};

/// Opaque identifier of one live session
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random identifier
    pub fn generate() -> Self {
        let raw: [u8; 16] = rand::thread_rng().gen();
        Self(hex::encode(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Knobs applied when a session is created
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct SessionConfig {
    /// Background poll schedule
    pub refresher: RefresherOptions,
}

/// Session-side half shared with the refresher and running device actions
pub(crate) struct SessionInner {
    id: SessionId,
    device: ConnectedDevice,
    connection: Box<dyn DeviceConnection>,
    /// Serialises exchanges; consumers queue on it, the refresher skips
    /// its poll while it is held
    exchange: AsyncMutex<()>,
    /// Pushes snapshots to observers, taken on close so their streams end
    state_tx: Mutex<Option<watch::Sender<DeviceSessionState>>>,
    /// Keeps snapshots readable after the sender is gone
    state_rx: watch::Receiver<DeviceSessionState>,
    closed: AtomicBool,
}

impl SessionInner {
    pub(crate) fn id(&self) -> &SessionId {
        &self.id
    }

    pub(crate) fn device(&self) -> &ConnectedDevice {
        &self.device
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn state(&self) -> DeviceSessionState {
        self.state_rx.borrow().clone()
    }

    pub(crate) fn observe_state(&self) -> watch::Receiver<DeviceSessionState> {
        match self.state_tx.lock().unwrap().as_ref() {
            Some(tx) => tx.subscribe(),
            // closed already, hand out a receiver that only yields the
            // final snapshot
            None => self.state_rx.clone(),
        }
    }

    /// Apply `f` to the session state, notifying observers when it
    /// actually changed something
    pub(crate) fn update_state(&self, f: impl FnOnce(&mut DeviceSessionState)) {
        if let Some(tx) = self.state_tx.lock().unwrap().as_ref() {
            tx.send_if_modified(|state| {
                let before = state.clone();
                f(state);
                *state != before
            });
        }
    }

    pub(crate) async fn exchange(
        &self,
        apdu: Vec<u8>,
        triggers_disconnection: bool,
    ) -> Result<ApduResponse, TransportError> {
        let _guard = self.exchange.lock().await;
        self.exchange_unlocked(apdu, triggers_disconnection).await
    }

    pub(crate) async fn request<C: Command>(
        &self,
        command: &C,
    ) -> CommandResult<C::Response, C::ErrorCodes> {
        let _guard = self.exchange.lock().await;
        self.request_unlocked(command).await
    }

    /// One refresher cycle, false once polling should stop
    pub(super) async fn refresh(&self) -> bool {
        // consumer exchanges win, skip the poll while one is in flight
        let Ok(_guard) = self.exchange.try_lock() else {
            trace!("session {} busy, poll skipped", self.id);
            return true;
        };

        match self.request_unlocked(&GetAppAndVersionCommand).await {
            Ok(app) => {
                self.update_state(|state| state.current_app = Some(app));
                true
            }
            // status already flipped by the exchange, keep polling until
            // the user unlocks
            Err(e) if e.is_device_locked() => true,
            Err(e) if e.is_disconnection() => {
                debug!("session {} lost its device: {e}", self.id);
                false
            }
            Err(e) => {
                warn!("session {} refresh failed: {e}", self.id);
                true
            }
        }
    }

    async fn request_unlocked<C: Command>(
        &self,
        command: &C,
    ) -> CommandResult<C::Response, C::ErrorCodes> {
        debug!("session {} sending {}", self.id, command.name());

        let apdu = command.apdu().to_bytes();
        let response = self
            .exchange_unlocked(apdu, command.triggers_disconnection())
            .await?;

        command.parse(&response)
    }

    async fn exchange_unlocked(
        &self,
        apdu: Vec<u8>,
        triggers_disconnection: bool,
    ) -> Result<ApduResponse, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let result = self.connection.exchange(apdu, triggers_disconnection).await;

        match &result {
            Ok(response) if response.status.is_locked() => {
                self.update_state(|state| state.status = DeviceStatus::Locked)
            }
            Ok(_) => self.update_state(|state| state.status = DeviceStatus::Connected),
            Err(TransportError::Disconnected) | Err(TransportError::Closed) => {
                self.update_state(|state| state.status = DeviceStatus::NotConnected)
            }
            // transient failures say nothing about the link
            Err(_) => (),
        }

        result
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!("session {} closing", self.id);

        self.connection.close();
        self.update_state(|state| state.status = DeviceStatus::NotConnected);
        // completes every observer stream
        let _ = self.state_tx.lock().unwrap().take();
    }
}

struct Refresher {
    options: RefresherOptions,
    handle: Option<JoinHandle<()>>,
}

/// One live device relationship.
///
/// Created by the SDK on connect, destroyed on disconnect or teardown.
/// Construction spawns the refresher, so sessions must be created inside a
/// tokio runtime.
pub struct DeviceSession {
    inner: Arc<SessionInner>,
    refresher: Mutex<Refresher>,
}

impl core::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("id", &self.inner.id)
            .field("device", &self.inner.device)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    pub fn new(
        device: ConnectedDevice,
        connection: impl DeviceConnection,
        config: SessionConfig,
    ) -> Self {
        let id = SessionId::generate();
        let (state_tx, state_rx) = watch::channel(DeviceSessionState::default());

        debug!(
            "session {} opened for {} ({})",
            id, device.name, device.model
        );

        let inner = Arc::new(SessionInner {
            id,
            device,
            connection: Box::new(connection),
            exchange: AsyncMutex::new(()),
            state_tx: Mutex::new(Some(state_tx)),
            state_rx,
            closed: AtomicBool::new(false),
        });

        let handle = (!config.refresher.disabled)
            .then(|| refresher::spawn(inner.clone(), config.refresher.polling_interval));

        Self {
            inner,
            refresher: Mutex::new(Refresher {
                options: config.refresher,
                handle,
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    /// Device this session talks to
    pub fn device(&self) -> &ConnectedDevice {
        &self.inner.device
    }

    /// Snapshot of the current session state
    pub fn state(&self) -> DeviceSessionState {
        self.inner.state()
    }

    /// Subscribe to state changes.
    ///
    /// The receiver holds the current snapshot immediately and sees every
    /// subsequent change; it completes once the session closes.
    pub fn observe_state(&self) -> watch::Receiver<DeviceSessionState> {
        self.inner.observe_state()
    }

    pub fn refresher_options(&self) -> RefresherOptions {
        self.refresher.lock().unwrap().options
    }

    /// Swap the refresher schedule without touching the connection
    pub fn set_refresher_options(&self, options: RefresherOptions) {
        let mut refresher = self.refresher.lock().unwrap();

        if let Some(handle) = refresher.handle.take() {
            handle.abort();
        }

        refresher.options = options;

        if !options.disabled && !self.inner.is_closed() {
            refresher.handle = Some(refresher::spawn(
                self.inner.clone(),
                options.polling_interval,
            ));
        }
    }

    /// Send a raw APDU, queueing behind any exchange already in flight
    pub async fn send_apdu(&self, apdu: Vec<u8>) -> Result<ApduResponse, TransportError> {
        self.inner.exchange(apdu, false).await
    }

    /// Send a typed command and parse its response
    pub async fn send_command<C: Command>(
        &self,
        command: &C,
    ) -> CommandResult<C::Response, C::ErrorCodes> {
        self.inner.request(command).await
    }

    /// Start a device action, returning its state stream and canceller
    pub fn execute<A: DeviceAction>(&self, action: A) -> DeviceActionHandle<A> {
        run_action(self.inner.clone(), action)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Stop the refresher, close the connection and complete observers.
    ///
    /// Safe to call more than once.
    pub fn close(&self) {
        {
            let mut refresher = self.refresher.lock().unwrap();
            if let Some(handle) = refresher.handle.take() {
                handle.abort();
            }
        }

        self.inner.close();
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}
