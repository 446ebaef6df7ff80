// Copyright (c) 2024-2025 The dmk developers

//! Virtual secure element device
//!
//! A byte-level device model ([`VirtualDevice`]) answering the OS command
//! set, plus a TCP server speaking the workspace frame protocol so SDK
//! transports can run complete flows without hardware. Usable as a library
//! from tests or as a standalone binary (this crate's `main`).

pub mod device;
pub mod server;

pub use device::{AppEntry, DeviceProfile, VirtualDevice};
pub use server::{serve, WIRE_FRAMER};
