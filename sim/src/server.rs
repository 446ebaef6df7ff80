// Copyright (c) 2024-2025 The dmk developers

//! TCP frame server
//!
//! Serves one [`VirtualDevice`] over TCP using the workspace frame
//! protocol: every frame is exactly [`WIRE_FRAMER`] frame-size bytes, zero
//! padded, no channel prefix, in both directions. All accepted links share
//! the device, matching a physical unit plugged into several hosts.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use log::{debug, info, trace};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use dmk_apdu::{ApduReceiver, ApduSender, FramerConfig};

use crate::device::VirtualDevice;

/// Framing used on the TCP link, both directions
pub const WIRE_FRAMER: FramerConfig = FramerConfig {
    channel: None,
    frame_size: 64,
    padding: true,
};

/// Accept connections forever, serving `device` to each
pub async fn serve(
    listener: TcpListener,
    device: Arc<Mutex<VirtualDevice>>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener address")?;
    info!("virtual device listening on {addr}");

    loop {
        let (stream, peer) = listener.accept().await.context("accept")?;
        info!("host connected from {peer}");

        let device = device.clone();
        tokio::spawn(async move {
            match serve_link(stream, device).await {
                Ok(()) => debug!("host {peer} hung up"),
                Err(e) => debug!("link with {peer} ended: {e}"),
            }
        });
    }
}

async fn serve_link(
    mut stream: TcpStream,
    device: Arc<Mutex<VirtualDevice>>,
) -> anyhow::Result<()> {
    let sender = ApduSender::new(WIRE_FRAMER)?;
    let mut receiver = ApduReceiver::new(WIRE_FRAMER);
    let mut frame = vec![0u8; WIRE_FRAMER.frame_size];

    loop {
        match stream.read_exact(&mut frame).await {
            Ok(_) => (),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e).context("frame read"),
        }

        // requests reassemble like responses, their tail bytes land in the
        // status slot and serialize straight back
        let Some(request) = receiver.handle_frame(&frame)? else {
            continue;
        };

        let apdu = request.to_bytes();
        trace!("=> {}", hex::encode(&apdu));

        let response = {
            let mut device = device.lock().unwrap();
            if !device.is_powered() {
                debug!("device powered off, dropping the link");
                return Ok(());
            }
            device.handle_apdu(&apdu)
        };
        trace!("<= {}", hex::encode(&response));

        for f in sender.get_frames(&response)? {
            stream.write_all(&f.to_bytes()).await?;
        }
    }
}
