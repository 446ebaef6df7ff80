// Copyright (c) 2024-2025 The dmk developers

//! SDK entry point

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};
use tokio::sync::watch;

use dmk_apdu::ApduResponse;

use dmk_core::{
    action::{DeviceAction, DeviceActionHandle},
    command::Command,
    device::ConnectedDevice,
    error::SessionError,
    session::{
        DeviceSession, DeviceSessionState, DeviceStatus, RefresherOptions, SessionConfig,
        SessionId, SessionRegistry,
    },
    transport::DeviceConnection,
};

use crate::{
    error::{DmkCommandError, DmkError},
    transport::Transport,
};

/// Assembles a [`Dmk`] instance
///
/// At least one transport must be registered for [`Dmk::connect`] to
/// succeed.
#[derive(Default)]
pub struct DmkBuilder {
    transports: Vec<Box<dyn Transport>>,
    refresher: RefresherOptions,
}

impl DmkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport, later registrations win on identifier clashes
    pub fn with_transport(mut self, transport: impl Transport) -> Self {
        self.transports.push(Box::new(transport));
        self
    }

    /// Refresher schedule applied to every session this instance opens
    pub fn with_refresher(mut self, options: RefresherOptions) -> Self {
        self.refresher = options;
        self
    }

    pub fn build(self) -> Dmk {
        let transports = self
            .transports
            .into_iter()
            .map(|t| (t.id(), t))
            .collect::<HashMap<_, _>>();

        debug!(
            "sdk ready with {} transport(s): {:?}",
            transports.len(),
            transports.keys().collect::<Vec<_>>()
        );

        Dmk {
            transports,
            registry: Arc::new(SessionRegistry::new()),
            refresher: self.refresher,
        }
    }
}

/// Device management kit
///
/// Owns the registered transports and the registry of live sessions.
/// Dropping the instance closes every remaining session.
pub struct Dmk {
    transports: HashMap<&'static str, Box<dyn Transport>>,
    registry: Arc<SessionRegistry>,
    refresher: RefresherOptions,
}

impl Dmk {
    pub fn builder() -> DmkBuilder {
        DmkBuilder::new()
    }

    /// Open a session to the device at `destination` through the transport
    /// registered under `transport_id`.
    ///
    /// When a session for the same device already exists its identifier is
    /// returned instead of holding a second link open.
    pub async fn connect(
        &self,
        transport_id: &str,
        destination: &str,
    ) -> Result<SessionId, DmkError> {
        let transport = self
            .transports
            .get(transport_id)
            .ok_or_else(|| DmkError::UnknownTransport(transport_id.to_string()))?;

        let (device, connection) = transport.open(destination).await?;

        if let Ok(existing) = self.registry.get_by_device(&device.id) {
            debug!(
                "device {} already served by session {}",
                device.id,
                existing.id()
            );
            connection.close();
            return Ok(existing.id().clone());
        }

        info!(
            "connected {} ({}) over {}",
            device.name, device.model, transport_id
        );

        let session = self.registry.add(DeviceSession::new(
            device,
            connection,
            SessionConfig {
                refresher: self.refresher,
            },
        ));

        let id = session.id().clone();
        spawn_monitor(self.registry.clone(), id.clone(), session.observe_state());

        Ok(id)
    }

    /// Close a session and drop it from the registry
    pub fn disconnect(&self, id: &SessionId) -> Result<(), DmkError> {
        self.registry
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(id.clone()).into())
    }

    /// Underlying session, for callers wanting the full session API
    pub fn session(&self, id: &SessionId) -> Result<Arc<DeviceSession>, DmkError> {
        Ok(self.registry.get(id)?)
    }

    /// Identifiers of every live session
    pub fn list_sessions(&self) -> Vec<SessionId> {
        self.registry
            .list()
            .iter()
            .map(|s| s.id().clone())
            .collect()
    }

    /// Device behind a session
    pub fn connected_device(&self, id: &SessionId) -> Result<ConnectedDevice, DmkError> {
        Ok(self.registry.get(id)?.device().clone())
    }

    /// Snapshot of a session's state
    pub fn device_session_state(&self, id: &SessionId) -> Result<DeviceSessionState, DmkError> {
        Ok(self.registry.get(id)?.state())
    }

    /// Subscribe to a session's state changes
    pub fn observe_device_session_state(
        &self,
        id: &SessionId,
    ) -> Result<watch::Receiver<DeviceSessionState>, DmkError> {
        Ok(self.registry.get(id)?.observe_state())
    }

    /// Send a raw APDU through a session
    pub async fn send_apdu(
        &self,
        id: &SessionId,
        apdu: Vec<u8>,
    ) -> Result<ApduResponse, DmkError> {
        let session = self.registry.get(id)?;
        Ok(session.send_apdu(apdu).await?)
    }

    /// Send a typed command through a session and parse its response
    pub async fn send_command<C: Command>(
        &self,
        id: &SessionId,
        command: &C,
    ) -> Result<C::Response, DmkCommandError<C::ErrorCodes>> {
        let session = self.registry.get(id)?;
        Ok(session.send_command(command).await?)
    }

    /// Start a device action on a session
    pub fn execute_device_action<A: DeviceAction>(
        &self,
        id: &SessionId,
        action: A,
    ) -> Result<DeviceActionHandle<A>, DmkError> {
        Ok(self.registry.get(id)?.execute(action))
    }

    /// Close every session, the instance stays usable for new connects
    pub fn close(&self) {
        self.registry.close_all();
    }
}

impl Drop for Dmk {
    fn drop(&mut self) {
        self.close();
    }
}

/// Retire the session once its device is gone.
///
/// Manual disconnects and teardown complete the state stream, which ends
/// the monitor quietly.
fn spawn_monitor(
    registry: Arc<SessionRegistry>,
    id: SessionId,
    mut states: watch::Receiver<DeviceSessionState>,
) {
    tokio::spawn(async move {
        loop {
            if states.borrow().status == DeviceStatus::NotConnected {
                debug!("session {} lost its device, removing", id);
                registry.remove(&id);
                break;
            }

            if states.changed().await.is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod test {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };

    use async_trait::async_trait;

    use dmk_apdu::{ApduReceiver, ApduSender, FramerConfig};
    use dmk_core::{
        command::os::GetAppAndVersionCommand,
        device::{DeviceId, DeviceModel},
        error::TransportError,
        transport::{ConnectionOptions, FrameChannel, FramedConnection},
    };
    use dmk_sim::VirtualDevice;

    use super::*;

    /// In-memory frame link serving a [`VirtualDevice`], no sockets involved
    struct VirtualChannel {
        device: Arc<Mutex<VirtualDevice>>,
        unplugged: Arc<AtomicBool>,
        sender: ApduSender,
        receiver: ApduReceiver,
        outbound: VecDeque<Vec<u8>>,
    }

    #[async_trait]
    impl FrameChannel for VirtualChannel {
        async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            if self.unplugged.load(Ordering::SeqCst) {
                return Err(TransportError::Disconnected);
            }

            let Some(request) = self.receiver.handle_frame(frame)? else {
                return Ok(());
            };

            let response = self.device.lock().unwrap().handle_apdu(&request.to_bytes());
            for f in self.sender.get_frames(&response)? {
                self.outbound.push_back(f.to_bytes());
            }
            Ok(())
        }

        async fn read_chunk(&mut self) -> Result<Vec<u8>, TransportError> {
            if self.unplugged.load(Ordering::SeqCst) {
                return Err(TransportError::Disconnected);
            }
            // only called while a response is owed
            self.outbound
                .pop_front()
                .ok_or(TransportError::Disconnected)
        }
    }

    #[derive(Clone, Default)]
    struct LoopbackTransport {
        device: Arc<Mutex<VirtualDevice>>,
        unplugged: Arc<AtomicBool>,
    }

    impl LoopbackTransport {
        fn unplug(&self) {
            self.unplugged.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Transport for LoopbackTransport {
        fn id(&self) -> &'static str {
            "loopback"
        }

        async fn open(
            &self,
            destination: &str,
        ) -> Result<(ConnectedDevice, FramedConnection), TransportError> {
            let framer = FramerConfig::default();
            let channel = VirtualChannel {
                device: self.device.clone(),
                unplugged: self.unplugged.clone(),
                sender: ApduSender::new(framer)?,
                receiver: ApduReceiver::new(framer),
                outbound: VecDeque::new(),
            };

            let connection = FramedConnection::new(
                channel,
                ConnectionOptions {
                    framer,
                    exchange_timeout: None,
                },
            )?;

            let device = ConnectedDevice {
                id: DeviceId::new(destination),
                name: "Virtual device".to_string(),
                model: DeviceModel::NanoX,
            };

            Ok((device, connection))
        }
    }

    fn test_dmk(transport: LoopbackTransport) -> Dmk {
        DmkBuilder::new()
            .with_transport(transport)
            .with_refresher(RefresherOptions::off())
            .build()
    }

    #[tokio::test]
    async fn unknown_transport_is_an_error() {
        let dmk = DmkBuilder::new().build();

        let err = dmk.connect("usb", "whatever").await.unwrap_err();
        assert_eq!(err, DmkError::UnknownTransport("usb".to_string()));
        assert_eq!(err.to_string(), "unknown transport 'usb'");
    }

    #[tokio::test]
    async fn connect_exchange_disconnect() {
        let dmk = test_dmk(LoopbackTransport::default());

        let id = dmk.connect("loopback", "virtual-0").await.unwrap();

        let app = dmk.send_command(&id, &GetAppAndVersionCommand).await.unwrap();
        assert!(app.is_dashboard());

        let device = dmk.connected_device(&id).unwrap();
        assert_eq!(device.id, DeviceId::from("virtual-0"));
        assert_eq!(device.model, DeviceModel::NanoX);
        assert_eq!(
            dmk.device_session_state(&id).unwrap().status,
            DeviceStatus::Connected
        );

        dmk.disconnect(&id).unwrap();
        assert!(dmk.list_sessions().is_empty());

        // the session is gone for every facade call afterwards
        assert_eq!(
            dmk.disconnect(&id).unwrap_err(),
            DmkError::Session(SessionError::NotFound(id.clone()))
        );
        let err = dmk
            .send_apdu(&id, vec![0xb0, 0x01, 0x00, 0x00, 0x00])
            .await
            .unwrap_err();
        assert_eq!(err, DmkError::Session(SessionError::NotFound(id)));
    }

    #[tokio::test]
    async fn connecting_twice_reuses_the_session() {
        let dmk = test_dmk(LoopbackTransport::default());

        let first = dmk.connect("loopback", "virtual-0").await.unwrap();
        let second = dmk.connect("loopback", "virtual-0").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(dmk.list_sessions().len(), 1);
    }

    #[tokio::test]
    async fn device_loss_retires_the_session() {
        let transport = LoopbackTransport::default();
        let dmk = test_dmk(transport.clone());

        let id = dmk.connect("loopback", "virtual-0").await.unwrap();

        transport.unplug();
        let err = dmk
            .send_apdu(&id, vec![0xb0, 0x01, 0x00, 0x00, 0x00])
            .await
            .unwrap_err();
        assert_eq!(err, DmkError::Transport(TransportError::Disconnected));

        // the monitor removes the session shortly after
        for _ in 0..100 {
            if dmk.list_sessions().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(dmk.list_sessions().is_empty());
    }

    #[tokio::test]
    async fn close_tears_every_session_down() {
        let dmk = test_dmk(LoopbackTransport::default());

        let a = dmk.connect("loopback", "virtual-0").await.unwrap();
        let b = dmk.connect("loopback", "virtual-1").await.unwrap();
        let session = dmk.session(&a).unwrap();

        dmk.close();

        assert!(session.is_closed());
        assert!(dmk.list_sessions().is_empty());
        assert!(dmk.session(&b).is_err());
    }

    #[tokio::test]
    async fn dropping_the_sdk_closes_sessions() {
        let session = {
            let dmk = test_dmk(LoopbackTransport::default());
            let id = dmk.connect("loopback", "virtual-0").await.unwrap();
            dmk.session(&id).unwrap()
        };

        assert!(session.is_closed());
    }
}
