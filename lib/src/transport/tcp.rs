// Copyright (c) 2024-2025 The dmk developers

//! TCP transport for virtual devices.

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use dmk_apdu::frame::FramerConfig;
use dmk_core::device::{ConnectedDevice, DeviceId, DeviceModel};
use dmk_core::error::TransportError;
use dmk_core::transport::{ConnectionOptions, FrameChannel, FramedConnection};

use super::Transport;

/// Frame layout spoken by `dmk-sim` servers, 64 byte zero padded frames with
/// no channel prefix
pub const TCP_FRAMER: FramerConfig = FramerConfig {
    channel: None,
    frame_size: 64,
    padding: true,
};

/// Transport reaching virtual devices over TCP, `dmk-sim` servers in
/// particular
///
/// Destinations are `host:port` pairs.
#[derive(Copy, Clone, Debug, Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    fn id(&self) -> &'static str {
        "tcp"
    }

    async fn open(
        &self,
        destination: &str,
    ) -> Result<(ConnectedDevice, FramedConnection), TransportError> {
        debug!("opening tcp link to {destination}");

        let stream = TcpStream::connect(destination).await?;
        let _ = stream.set_nodelay(true);

        let channel = TcpFrameChannel {
            stream,
            frame: vec![0u8; TCP_FRAMER.frame_size],
        };
        let connection = FramedConnection::new(
            channel,
            ConnectionOptions {
                framer: TCP_FRAMER,
                exchange_timeout: None,
            },
        )?;

        // TCP endpoints carry no discovery metadata, identify by address
        let device = ConnectedDevice {
            id: DeviceId::new(format!("tcp:{destination}")),
            name: format!("Virtual device ({destination})"),
            model: DeviceModel::NanoX,
        };

        Ok((device, connection))
    }
}

/// Frame sized reads and writes over one TCP stream
struct TcpFrameChannel {
    stream: TcpStream,
    frame: Vec<u8>,
}

#[async_trait]
impl FrameChannel for TcpFrameChannel {
    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(frame).await?;
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Vec<u8>, TransportError> {
        self.stream.read_exact(&mut self.frame).await?;
        Ok(self.frame.clone())
    }
}
