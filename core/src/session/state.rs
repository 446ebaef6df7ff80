// Copyright (c) 2024-2025 The dmk developers

//! Observable per-session device state

use strum::Display;

use crate::command::os::{AppAndVersion, BatteryStatus, InstalledApp, OsInfo};

/// Reachability of a session's device
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum DeviceStatus {
    /// Device is reachable and answering commands
    #[strum(serialize = "connected")]
    Connected,
    /// Device is reachable but waiting for its PIN
    #[strum(serialize = "locked")]
    Locked,
    /// Underlying link is gone
    #[strum(serialize = "not-connected")]
    NotConnected,
}

/// Snapshot of everything a session knows about its device.
///
/// Only the owning session writes this (consumer commands and the
/// background refresher); consumers read copies via
/// [DeviceSession::state][super::DeviceSession::state] or subscribe with
/// [DeviceSession::observe_state][super::DeviceSession::observe_state].
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSessionState {
    /// Current reachability
    pub status: DeviceStatus,
    /// Application reported by the last app-and-version poll
    pub current_app: Option<AppAndVersion>,
    /// Catalogue fetched by the list-apps flow, `None` until fetched
    pub installed_apps: Option<Vec<InstalledApp>>,
    /// Last battery reading, battery powered models only
    pub battery: Option<BatteryStatus>,
    /// OS information fetched during device-status checks
    pub os: Option<OsInfo>,
}

impl Default for DeviceSessionState {
    fn default() -> Self {
        Self {
            status: DeviceStatus::Connected,
            current_app: None,
            installed_apps: None,
            battery: None,
            os: None,
        }
    }
}

impl DeviceSessionState {
    /// True while the device answers human-driven flows
    pub fn is_connected(&self) -> bool {
        matches!(self.status, DeviceStatus::Connected | DeviceStatus::Locked)
    }
}
