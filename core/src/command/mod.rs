// Copyright (c) 2024-2025 The dmk developers

//! Command abstraction
//!
//! A [`Command`] is a stateless value pairing APDU construction with response
//! parsing. Sessions serialize and transmit the APDU, then hand the
//! [`ApduResponse`] back to the same command for interpretation, so all
//! status word knowledge stays next to the wire format it belongs to.

use core::fmt::{Debug, Display};

use dmk_apdu::{Apdu, ApduResponse};

pub mod error;
pub mod os;

pub use error::{CommandError, GlobalCommandError, NoErrors};

/// Outcome of dispatching a command and parsing its response
pub type CommandResult<T, E = NoErrors> = Result<T, CommandError<E>>;

/// A device command: one APDU out, one response back
pub trait Command: Send + Sync {
    /// Parsed response payload
    type Response: Send;

    /// Command specific status word mappings, [`NoErrors`] when the shared
    /// OS table covers everything
    type ErrorCodes: Display + Debug + Send;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Build the command APDU
    fn apdu(&self) -> Apdu;

    /// Interpret the device response
    ///
    /// Commands that treat additional status words as success (continuation
    /// style protocols) handle those here before falling back to
    /// [`GlobalCommandError::from_status`].
    fn parse(&self, response: &ApduResponse) -> CommandResult<Self::Response, Self::ErrorCodes>;

    /// Whether the device link is expected to drop after this command
    /// succeeds (application open / close re-enumerate on some transports)
    fn triggers_disconnection(&self) -> bool {
        false
    }
}

/// Map a non-success status through the shared OS table
///
/// Helper for `parse` implementations without command specific codes.
pub fn check_status<E: Display + Debug>(
    response: &ApduResponse,
) -> Result<(), CommandError<E>> {
    if response.status.is_success() {
        Ok(())
    } else {
        Err(CommandError::Global(GlobalCommandError::from_status(
            response.status,
        )))
    }
}
