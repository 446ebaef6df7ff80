// Copyright (c) 2024-2025 The dmk developers

use dmk_apdu::{
    os::{DeviceInstruction, CLA_DEVICE},
    Apdu, ApduError, ApduResponse, StatusWord, APDU_MAX_DATA,
};

use crate::command::{Command, CommandError, CommandResult, GlobalCommandError};

/// Status words specific to opening an application
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum OpenAppErrorCodes {
    /// User refused the open prompt
    #[error("open refused by user")]
    Refused,

    /// No application with that name installed
    #[error("application not installed")]
    NotInstalled,
}

/// Ask the dashboard to launch an application by name
///
/// The device prompts for confirmation, so this only resolves after user
/// interaction. On USB the device re-enumerates once the app starts.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OpenAppCommand {
    name: String,
}

impl OpenAppCommand {
    /// Fails when the name cannot travel in an APDU data section
    pub fn new(name: impl Into<String>) -> Result<Self, ApduError> {
        let name = name.into();
        if !name.is_ascii() {
            return Err(ApduError::InvalidAscii);
        }
        if name.is_empty() || name.len() > APDU_MAX_DATA {
            return Err(ApduError::DataOverflow);
        }
        Ok(Self { name })
    }

    pub fn app_name(&self) -> &str {
        &self.name
    }
}

impl Command for OpenAppCommand {
    type Response = ();
    type ErrorCodes = OpenAppErrorCodes;

    fn name(&self) -> &'static str {
        "OpenApp"
    }

    fn apdu(&self) -> Apdu {
        let mut apdu = Apdu::new(CLA_DEVICE, DeviceInstruction::OpenApp.into(), 0x00, 0x00);
        apdu.data = self.name.as_bytes().to_vec();
        apdu
    }

    fn parse(&self, response: &ApduResponse) -> CommandResult<(), OpenAppErrorCodes> {
        match response.status {
            s if s.is_success() => Ok(()),
            StatusWord::CONDITIONS_NOT_SATISFIED | StatusWord::ACTION_REFUSED => {
                Err(CommandError::App(OpenAppErrorCodes::Refused))
            }
            StatusWord::INCORRECT_DATA => Err(CommandError::App(OpenAppErrorCodes::NotInstalled)),
            s => Err(CommandError::Global(GlobalCommandError::from_status(s))),
        }
    }

    fn triggers_disconnection(&self) -> bool {
        true
    }
}
