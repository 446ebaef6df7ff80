// Copyright (c) 2024-2025 The dmk developers

//! Command dispatch and status word errors

use core::fmt::{Debug, Display};

use dmk_apdu::{ApduError, StatusWord};

use crate::error::TransportError;

/// Placeholder for commands without specific status word mappings
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NoErrors {}

impl Display for NoErrors {
    fn fmt(&self, _f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {}
    }
}

/// Status words every application and the OS can return
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum GlobalCommandError {
    /// Device is locked, unlock before retrying
    #[error("device locked")]
    DeviceLocked,

    /// User refused the pending action on the device
    #[error("action refused on device")]
    ActionRefused,

    /// PIN has not been validated
    #[error("pin not validated")]
    PinNotValidated,

    /// Security status not satisfied
    #[error("security not satisfied")]
    SecurityNotSatisfied,

    /// Conditions of use not satisfied
    #[error("conditions of use not satisfied")]
    ConditionsNotSatisfied,

    /// Incorrect command data
    #[error("incorrect data")]
    IncorrectData,

    /// Instruction unknown to the running application
    #[error("instruction not supported")]
    InsNotSupported,

    /// Class unknown, the expected application is not open
    #[error("class not supported")]
    ClaNotSupported,

    /// Status word outside the shared table
    #[error("unexpected status {0}")]
    Unknown(StatusWord),
}

impl GlobalCommandError {
    pub fn from_status(status: StatusWord) -> Self {
        match status {
            StatusWord::LOCKED => Self::DeviceLocked,
            StatusWord::ACTION_REFUSED => Self::ActionRefused,
            StatusWord::PIN_NOT_VALIDATED => Self::PinNotValidated,
            StatusWord::SECURITY_NOT_SATISFIED => Self::SecurityNotSatisfied,
            StatusWord::CONDITIONS_NOT_SATISFIED => Self::ConditionsNotSatisfied,
            StatusWord::INCORRECT_DATA => Self::IncorrectData,
            StatusWord::INS_NOT_SUPPORTED => Self::InsNotSupported,
            StatusWord::CLA_NOT_SUPPORTED => Self::ClaNotSupported,
            _ => Self::Unknown(status),
        }
    }
}

/// Failure modes of a dispatched command
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum CommandError<E: Display + Debug = NoErrors> {
    /// Status word mapped by the command's own table
    #[error("command rejected: {0}")]
    App(E),

    /// Status word mapped by the shared OS table
    #[error(transparent)]
    Global(GlobalCommandError),

    /// Success status but an undecodable payload
    #[error("malformed response: {0}")]
    Parse(#[from] ApduError),

    /// Command never reached the device or the response never arrived
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl<E: Display + Debug> CommandError<E> {
    /// Whether the failure reports a locked device
    pub fn is_device_locked(&self) -> bool {
        matches!(self, Self::Global(GlobalCommandError::DeviceLocked))
    }

    /// Whether the failure means the device link is gone for good
    pub fn is_disconnection(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::Disconnected) | Self::Transport(TransportError::Closed)
        )
    }
}
