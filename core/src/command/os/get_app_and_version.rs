// Copyright (c) 2024-2025 The dmk developers

use dmk_apdu::{
    os::{DashboardInstruction, CLA_DASHBOARD, DASHBOARD_NAME},
    Apdu, ApduError, ApduParser, ApduResponse,
};

use crate::command::{check_status, Command, CommandResult, NoErrors};

/// Name and version of the currently running application
///
/// The dashboard reports itself as [`DASHBOARD_NAME`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AppAndVersion {
    pub name: String,
    pub version: String,
    pub flags: Vec<u8>,
}

impl AppAndVersion {
    pub fn is_dashboard(&self) -> bool {
        self.name == DASHBOARD_NAME
    }
}

/// Query the running application, answered by every app and the dashboard
#[derive(Copy, Clone, Default, Debug)]
pub struct GetAppAndVersionCommand;

impl Command for GetAppAndVersionCommand {
    type Response = AppAndVersion;
    type ErrorCodes = NoErrors;

    fn name(&self) -> &'static str {
        "GetAppAndVersion"
    }

    fn apdu(&self) -> Apdu {
        Apdu::new(
            CLA_DASHBOARD,
            DashboardInstruction::GetAppAndVersion.into(),
            0x00,
            0x00,
        )
    }

    fn parse(&self, response: &ApduResponse) -> CommandResult<Self::Response> {
        check_status(response)?;

        let mut p = ApduParser::new(&response.data);

        let format = p.read_u8()?;
        if format != 0x01 {
            return Err(ApduError::InvalidFormat(format).into());
        }

        let name = p.read_lv_ascii()?;
        let version = p.read_lv_ascii()?;
        let flags = if p.is_empty() {
            Vec::new()
        } else {
            p.read_lv()?.to_vec()
        };

        Ok(AppAndVersion {
            name,
            version,
            flags,
        })
    }
}
