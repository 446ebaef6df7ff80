// Copyright (c) 2024-2025 The dmk developers

//! Framed connection driver

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::sync::{mpsc, oneshot, Notify};

use dmk_apdu::{ApduReceiver, ApduResponse, ApduSender, FramerConfig};

use crate::{
    error::TransportError,
    transport::{DeviceConnection, FrameChannel},
};

/// Options for a [`FramedConnection`]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct ConnectionOptions {
    pub framer: FramerConfig,

    /// Abandon an exchange after this long without a complete response
    ///
    /// Off by default: commands waiting on a user prompt legitimately take
    /// minutes. A timed out exchange leaves the frame stream in an unknown
    /// state, so the connection shuts down with it.
    pub exchange_timeout: Option<Duration>,
}

const LINK_ALIVE: u8 = 0;
const LINK_CLOSED: u8 = 1;
const LINK_DEAD: u8 = 2;

struct ExchangeRequest {
    apdu: Vec<u8>,
    triggers_disconnection: bool,
    respond: oneshot::Sender<Result<ApduResponse, TransportError>>,
}

/// Drives a [`FrameChannel`] from a dedicated I/O task
///
/// Exchanges are queued and processed strictly one at a time. A caller that
/// stops waiting does not abort the in-flight exchange, the protocol has no
/// abort primitive, the response is simply discarded when it lands. Link
/// loss rejects the in-flight and all queued exchanges, later calls fail
/// fast.
#[derive(Clone)]
pub struct FramedConnection {
    cmd_tx: mpsc::UnboundedSender<ExchangeRequest>,
    shutdown: Arc<Notify>,
    state: Arc<AtomicU8>,
}

impl FramedConnection {
    pub fn new(
        channel: impl FrameChannel + 'static,
        options: ConnectionOptions,
    ) -> Result<Self, TransportError> {
        let sender = ApduSender::new(options.framer)?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());
        let state = Arc::new(AtomicU8::new(LINK_ALIVE));

        tokio::spawn(task(
            Box::new(channel),
            sender,
            options,
            cmd_rx,
            shutdown.clone(),
            state.clone(),
        ));

        Ok(Self {
            cmd_tx,
            shutdown,
            state,
        })
    }

    fn fail_error(&self) -> TransportError {
        match self.state.load(Ordering::SeqCst) {
            LINK_DEAD => TransportError::Disconnected,
            _ => TransportError::Closed,
        }
    }
}

#[async_trait]
impl DeviceConnection for FramedConnection {
    async fn exchange(
        &self,
        apdu: Vec<u8>,
        triggers_disconnection: bool,
    ) -> Result<ApduResponse, TransportError> {
        let (respond, result) = oneshot::channel();

        self.cmd_tx
            .send(ExchangeRequest {
                apdu,
                triggers_disconnection,
                respond,
            })
            .map_err(|_| self.fail_error())?;

        match result.await {
            Ok(r) => r,
            Err(_) => Err(self.fail_error()),
        }
    }

    fn close(&self) {
        self.shutdown.notify_one();
    }

    fn is_alive(&self) -> bool {
        self.state.load(Ordering::SeqCst) == LINK_ALIVE
    }
}

async fn task(
    mut channel: Box<dyn FrameChannel>,
    sender: ApduSender,
    options: ConnectionOptions,
    mut cmd_rx: mpsc::UnboundedReceiver<ExchangeRequest>,
    shutdown: Arc<Notify>,
    state: Arc<AtomicU8>,
) {
    let mut reason = LINK_CLOSED;

    loop {
        let req = tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            r = cmd_rx.recv() => match r {
                Some(v) => v,
                None => break,
            },
        };

        let result = match options.exchange_timeout {
            Some(t) => {
                match tokio::time::timeout(t, exchange_once(&mut channel, &sender, options, &req))
                    .await
                {
                    Ok(r) => r,
                    Err(_) => Err(TransportError::Timeout),
                }
            }
            None => exchange_once(&mut channel, &sender, options, &req).await,
        };

        let fatal = matches!(
            result,
            Err(TransportError::Disconnected | TransportError::Io(_) | TransportError::Timeout)
        );
        if matches!(result, Err(TransportError::Disconnected)) {
            reason = LINK_DEAD;
        }

        // a gone caller means the result is discarded, nothing more
        if req.respond.send(result).is_err() {
            trace!("exchange result discarded, caller gone");
        }

        if fatal {
            break;
        }
    }

    state.store(reason, Ordering::SeqCst);

    // reject everything still queued
    cmd_rx.close();
    let error = match reason {
        LINK_DEAD => TransportError::Disconnected,
        _ => TransportError::Closed,
    };
    while let Ok(req) = cmd_rx.try_recv() {
        let _ = req.respond.send(Err(error.clone()));
    }

    debug!("connection task stopped ({error})");
}

async fn exchange_once(
    channel: &mut Box<dyn FrameChannel>,
    sender: &ApduSender,
    options: ConnectionOptions,
    req: &ExchangeRequest,
) -> Result<ApduResponse, TransportError> {
    debug!("=> {}", hex::encode(&req.apdu));

    let frames = sender.get_frames(&req.apdu)?;
    for f in &frames {
        channel.write_frame(&f.to_bytes()).await?;
    }

    // fresh reassembly per exchange, one command-response cycle at a time
    let mut receiver = ApduReceiver::new(options.framer);
    let response = loop {
        let chunk = channel.read_chunk().await?;
        match receiver.handle_frame(&chunk) {
            Ok(Some(r)) => break r,
            Ok(None) => continue,
            Err(e) => {
                warn!("dropping response: {e}");
                return Err(e.into());
            }
        }
    };

    debug!("<= {} {}", hex::encode(&response.data), response.status);

    if req.triggers_disconnection && response.is_success() {
        debug!("command expects the link to drop");
    }

    Ok(response)
}
