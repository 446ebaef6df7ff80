// Copyright (c) 2024-2025 The dmk developers

//! Prelude to simplify downstream use of the SDK
//!

pub use crate::{
    error::{DmkCommandError, DmkError},
    sdk::{Dmk, DmkBuilder},
    transport::Transport,
};

#[cfg(feature = "transport_tcp")]
pub use crate::transport::{TcpTransport, TCP_FRAMER};

pub use dmk_apdu::{Apdu, ApduBuilder, ApduResponse, StatusWord};

pub use dmk_core::{
    action::{
        os::{
            GetDeviceStatusAction, GoToDashboardAction, ListAppsAction, OpenAppAction,
            SendCommandInAppAction, DEFAULT_UNLOCK_TIMEOUT,
        },
        ActionCanceller, ActionState, DeviceAction, DeviceActionHandle, DeviceActionState,
        UserInteractionRequired,
    },
    command::{
        os::{
            AppAndVersion, BatteryStatus, BatteryStatusType, CloseAppCommand,
            GetAppAndVersionCommand, GetBatteryStatusCommand, GetOsVersionCommand,
            InstalledApp, ListAppsCommand, OpenAppCommand, OsInfo,
        },
        Command, CommandError,
    },
    device::{ConnectedDevice, DeviceId, DeviceModel},
    error::{SessionError, TransportError},
    session::{
        DeviceSession, DeviceSessionState, DeviceStatus, RefresherOptions, SessionId,
    },
};
