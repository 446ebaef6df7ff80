// Copyright (c) 2024-2025 The dmk developers

//! Operating system command classes and instruction codes
//!
//! Two classes are in use: `0xb0` for dashboard commands answered whatever
//! application is running, `0xe0` for device commands handled by the OS.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Dashboard command class
pub const CLA_DASHBOARD: u8 = 0xb0;

/// Device / OS command class
pub const CLA_DEVICE: u8 = 0xe0;

/// Name reported by the dashboard when no application is open
pub const DASHBOARD_NAME: &str = "BOLOS";

/// Instructions under [`CLA_DASHBOARD`]
#[derive(Copy, Clone, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DashboardInstruction {
    /// Fetch the running application name and version
    GetAppAndVersion = 0x01,

    /// Exit the running application back to the dashboard
    CloseApp = 0xa7,
}

/// Instructions under [`CLA_DEVICE`]
#[derive(Copy, Clone, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DeviceInstruction {
    /// Fetch OS version and secure element flags
    GetOsVersion = 0x01,

    /// Fetch battery state, selector in p2
    GetBatteryStatus = 0x10,

    /// Open an application by name
    OpenApp = 0xd8,

    /// List installed applications, first page
    ListApps = 0xde,

    /// List installed applications, following pages
    ListAppsContinue = 0xdf,
}
