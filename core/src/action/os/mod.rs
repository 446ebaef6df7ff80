// Copyright (c) 2024-2025 The dmk developers

//! Built-in OS flows
//!
//! Each flow follows the same shape: establish device status first, then
//! do its own work, persisting whatever it learned into the session state.
//! Higher level flows compose the lower ones, all the way up to
//! [SendCommandInAppAction] which most application SDKs build on.

use std::time::Duration;

mod get_device_status;
mod go_to_dashboard;
mod list_apps;
mod open_app;
mod send_command_in_app;

pub use get_device_status::{GetDeviceStatusAction, GetDeviceStatusError};
pub use go_to_dashboard::{GoToDashboardAction, GoToDashboardError};
pub use list_apps::{ListAppsAction, ListAppsError};
pub use open_app::{OpenAppAction, OpenAppError};
pub use send_command_in_app::{SendCommandInAppAction, SendCommandInAppError};

/// How long unlock prompts wait for the user by default
pub const DEFAULT_UNLOCK_TIMEOUT: Duration = Duration::from_secs(15);
