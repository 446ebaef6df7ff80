// Copyright (c) 2024-2025 The dmk developers

#![allow(unused)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use dmk_apdu::{ApduReceiver, ApduSender, FramerConfig};
use dmk_core::{
    device::{ConnectedDevice, DeviceId, DeviceModel},
    error::TransportError,
    session::{DeviceSession, RefresherOptions, SessionConfig},
    transport::{ConnectionOptions, FrameChannel, FramedConnection},
};
use dmk_sim::{DeviceProfile, VirtualDevice};

/// Framing on the in-memory link, channel prefixed like a HID transport
pub const TEST_FRAMER: FramerConfig = FramerConfig {
    channel: Some(0x0101),
    frame_size: 64,
    padding: true,
};

#[derive(Clone, Default)]
struct LinkState {
    unplugged: Arc<AtomicBool>,
    /// Applied to every response delivery
    latency: Arc<Mutex<Duration>>,
    /// Requests the device answered
    served: Arc<AtomicUsize>,
}

/// In-memory frame link serving a [VirtualDevice], no sockets involved
struct VirtualChannel {
    device: Arc<Mutex<VirtualDevice>>,
    link: LinkState,
    sender: ApduSender,
    receiver: ApduReceiver,
    outbound: VecDeque<Vec<u8>>,
}

#[async_trait]
impl FrameChannel for VirtualChannel {
    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.link.unplugged.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }

        // requests reassemble like responses, their tail bytes land in the
        // status slot and serialize straight back
        let Some(request) = self.receiver.handle_frame(frame)? else {
            return Ok(());
        };

        let response = self.device.lock().unwrap().handle_apdu(&request.to_bytes());
        self.link.served.fetch_add(1, Ordering::SeqCst);

        for f in self.sender.get_frames(&response)? {
            self.outbound.push_back(f.to_bytes());
        }
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.link.unplugged.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }

        let latency = *self.link.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        // only polled while a response is owed
        self.outbound
            .pop_front()
            .ok_or(TransportError::Disconnected)
    }
}

/// One virtual device session plus the hooks tests script it with
pub struct TestLink {
    pub session: DeviceSession,
    pub device: Arc<Mutex<VirtualDevice>>,
    link: LinkState,
}

impl TestLink {
    pub fn new(profile: DeviceProfile, refresher: RefresherOptions) -> Self {
        let device = Arc::new(Mutex::new(VirtualDevice::new(profile)));
        let link = LinkState::default();

        let connection = FramedConnection::new(
            VirtualChannel {
                device: device.clone(),
                link: link.clone(),
                sender: ApduSender::new(TEST_FRAMER).unwrap(),
                receiver: ApduReceiver::new(TEST_FRAMER),
                outbound: VecDeque::new(),
            },
            ConnectionOptions {
                framer: TEST_FRAMER,
                exchange_timeout: None,
            },
        )
        .unwrap();

        let session = DeviceSession::new(
            ConnectedDevice {
                id: DeviceId::from("virtual-0"),
                name: device.lock().unwrap().name().to_string(),
                model: DeviceModel::NanoX,
            },
            connection,
            SessionConfig { refresher },
        );

        Self {
            session,
            device,
            link,
        }
    }

    /// Sever the link, like pulling the cable
    pub fn unplug(&self) {
        self.link.unplugged.store(true, Ordering::SeqCst);
    }

    /// Delay response delivery, keeping exchanges in flight for a while
    pub fn set_latency(&self, latency: Duration) {
        *self.link.latency.lock().unwrap() = latency;
    }

    /// Requests the device has answered so far
    pub fn served(&self) -> usize {
        self.link.served.load(Ordering::SeqCst)
    }
}

pub fn default_link() -> TestLink {
    TestLink::new(DeviceProfile::default(), RefresherOptions::off())
}
