// Copyright (c) 2024-2025 The dmk developers

//! Device management kit core
//!
//! This crate contains everything between a raw device link and the
//! consumer-facing SDK: connections, sessions, typed commands and the
//! device-action orchestrator. Transport backends live elsewhere and only
//! implement [`FrameChannel`][transport::FrameChannel]; see [dmk_apdu] for
//! APDU objects and wire encodings.
//!
//! ## Layering
//!
//! A [`FramedConnection`][transport::FramedConnection] adapts one frame
//! channel into a [`DeviceConnection`][transport::DeviceConnection]: it owns
//! the link, chunks APDUs into frames, reassembles responses and serialises
//! callers so exchanges never interleave.
//!
//! A [`DeviceSession`][session::DeviceSession] pairs one connection with the
//! observable [`DeviceSessionState`][session::DeviceSessionState] (device
//! reachability, running application, installed applications, battery). The
//! session polls the device in the background and pushes every state change
//! to subscribers; the [`SessionRegistry`][session::SessionRegistry] tracks
//! all live sessions by identifier and device.
//!
//! ## Commands
//!
//! A [`Command`][command::Command] pairs APDU construction with response
//! parsing, so status word knowledge stays next to the wire format it
//! belongs to. OS commands such as
//! [`GetAppAndVersionCommand`][command::os::GetAppAndVersionCommand] or
//! [`OpenAppCommand`][command::os::OpenAppCommand] are built in; application
//! commands implement the same trait outside this crate.
//!
//! ## Device actions
//!
//! Multi-step flows (get the device unlocked, reach the dashboard, open an
//! application and run a command inside it) are modelled as
//! [`DeviceAction`][action::DeviceAction]s: cancellable state machines
//! emitting intermediate [user interaction][action::UserInteractionRequired]
//! requests and exactly one terminal
//! [state][action::DeviceActionState]. The built-in OS flows live under
//! [`action::os`].

pub mod action;
pub mod command;
pub mod device;
pub mod error;
pub mod session;
pub mod transport;

pub use dmk_apdu as apdu;
