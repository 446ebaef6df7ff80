// Copyright (c) 2024-2025 The dmk developers

//! Operating system commands
//!
//! The commands every device answers regardless of the running application:
//! app and OS introspection, application open / close, installed app
//! enumeration and battery state.

mod close_app;
mod get_app_and_version;
mod get_battery_status;
mod get_os_version;
mod list_apps;
mod open_app;

pub use close_app::CloseAppCommand;
pub use get_app_and_version::{AppAndVersion, GetAppAndVersionCommand};
pub use get_battery_status::{
    BatteryFlags, BatteryStatus, BatteryStatusType, GetBatteryStatusCommand,
};
pub use get_os_version::{GetOsVersionCommand, OsInfo, SeFlags};
pub use list_apps::{InstalledApp, ListAppsCommand};
pub use open_app::{OpenAppCommand, OpenAppErrorCodes};
