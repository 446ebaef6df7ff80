// Copyright (c) 2024-2025 The dmk developers

use dmk_apdu::{
    os::{DashboardInstruction, CLA_DASHBOARD},
    Apdu, ApduResponse,
};

use crate::command::{check_status, Command, CommandResult, NoErrors};

/// Exit the running application back to the dashboard
#[derive(Copy, Clone, Default, Debug)]
pub struct CloseAppCommand;

impl Command for CloseAppCommand {
    type Response = ();
    type ErrorCodes = NoErrors;

    fn name(&self) -> &'static str {
        "CloseApp"
    }

    fn apdu(&self) -> Apdu {
        Apdu::new(
            CLA_DASHBOARD,
            DashboardInstruction::CloseApp.into(),
            0x00,
            0x00,
        )
    }

    fn parse(&self, response: &ApduResponse) -> CommandResult<()> {
        check_status(response)
    }

    fn triggers_disconnection(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dmk_apdu::StatusWord;

    #[test]
    fn apdu_bytes() {
        assert_eq!(
            CloseAppCommand.apdu().to_bytes(),
            vec![0xb0, 0xa7, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn success_parses_to_unit() {
        let r = CloseAppCommand.parse(&ApduResponse::new(StatusWord::OK, vec![]));
        assert!(r.is_ok());
    }
}
