// Copyright (c) 2024-2025 The dmk developers

//! Transport and session level errors

use dmk_apdu::{FramerError, ReceiverError};

use crate::{device::DeviceId, session::SessionId};

/// Errors crossing the transport boundary
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection closed by the host side
    #[error("device link closed")]
    Closed,

    /// Device link dropped
    #[error("device disconnected")]
    Disconnected,

    /// No response within the exchange deadline
    #[error("exchange timed out")]
    Timeout,

    /// Transport I/O failure
    #[error("transport i/o failed: {0}")]
    Io(String),

    /// APDU could not be framed
    #[error("framing failed: {0}")]
    Framer(#[from] FramerError),

    /// Device frames could not be reassembled
    #[error("frame reassembly failed: {0}")]
    Receiver(#[from] ReceiverError),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match e.kind() {
            UnexpectedEof | ConnectionReset | ConnectionAborted | BrokenPipe | NotConnected => {
                Self::Disconnected
            }
            _ => Self::Io(e.to_string()),
        }
    }
}

/// Session lookup errors
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum SessionError {
    /// No session with the given identifier
    #[error("unknown session {0}")]
    NotFound(SessionId),

    /// No session attached to the given device
    #[error("no session for device {0}")]
    DeviceNotFound(DeviceId),
}
