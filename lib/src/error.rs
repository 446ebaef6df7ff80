// Copyright (c) 2024-2025 The dmk developers

//! SDK level error types.

use core::fmt::{Debug, Display};

use dmk_core::command::{CommandError, NoErrors};
use dmk_core::error::{SessionError, TransportError};

/// Errors surfaced by [`Dmk`][crate::Dmk] operations
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum DmkError {
    /// No transport registered under the requested identifier
    #[error("unknown transport '{0}'")]
    UnknownTransport(String),

    /// Opening the link or exchanging with the device failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Session lookup failed
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors surfaced by [`Dmk::send_command`][crate::Dmk::send_command]
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum DmkCommandError<E: Display + Debug = NoErrors> {
    /// Session lookup failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The command itself failed
    #[error(transparent)]
    Command(#[from] CommandError<E>),
}
