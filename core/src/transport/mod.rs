// Copyright (c) 2024-2025 The dmk developers

//! Transport boundary
//!
//! Backends only implement [`FrameChannel`]: write one raw frame, yield the
//! next burst of received bytes, report link loss. Everything protocol
//! shaped (chunking, reassembly, queueing) lives in [`FramedConnection`]
//! which adapts a channel into the [`DeviceConnection`] sessions consume.

use async_trait::async_trait;

use dmk_apdu::ApduResponse;

use crate::error::TransportError;

mod connection;

pub use connection::{ConnectionOptions, FramedConnection};

/// Raw frame medium provided by a transport backend
#[async_trait]
pub trait FrameChannel: Send {
    /// Write one serialized frame to the device
    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Receive the next chunk of bytes from the device
    ///
    /// A chunk is whatever the medium delivers at once (a HID input report,
    /// one frame off a stream). Returns [`TransportError::Disconnected`]
    /// once the link is gone.
    async fn read_chunk(&mut self) -> Result<Vec<u8>, TransportError>;
}

/// An open device link able to exchange APDUs
#[async_trait]
pub trait DeviceConnection: Send + Sync + 'static {
    /// Send one APDU and await its response
    ///
    /// Callers are queued, exchanges never interleave. `triggers_disconnection`
    /// marks commands after which the device is expected to drop the link.
    async fn exchange(
        &self,
        apdu: Vec<u8>,
        triggers_disconnection: bool,
    ) -> Result<ApduResponse, TransportError>;

    /// Shut the connection down, pending exchanges fail with
    /// [`TransportError::Closed`]
    fn close(&self);

    /// Whether the link is still usable
    fn is_alive(&self) -> bool;
}
