// Copyright (c) 2024-2025 The dmk developers

//! Transport plugins for [`Dmk`][crate::Dmk].
//!
//! A [`Transport`] knows how to reach devices of one kind and turn a
//! destination string into a live [`FramedConnection`]. Implementations are
//! registered on [`DmkBuilder`][crate::DmkBuilder] and selected by
//! [`Transport::id`] when connecting.

use async_trait::async_trait;

use dmk_core::device::ConnectedDevice;
use dmk_core::error::TransportError;
use dmk_core::transport::FramedConnection;

#[cfg(feature = "transport_tcp")]
mod tcp;
#[cfg(feature = "transport_tcp")]
pub use tcp::{TcpTransport, TCP_FRAMER};

/// Connection factory for one kind of device link
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Identifier used to select this transport on connect, "tcp" for example
    fn id(&self) -> &'static str;

    /// Open a connection to the device at `destination`.
    ///
    /// The destination format is transport specific, a `host:port` pair for
    /// TCP. Returns the discovered device identity together with the framed
    /// connection serving it.
    async fn open(
        &self,
        destination: &str,
    ) -> Result<(ConnectedDevice, FramedConnection), TransportError>;
}
