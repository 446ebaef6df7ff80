// Copyright (c) 2024-2025 The dmk developers

use dmk_apdu::{
    os::{DeviceInstruction, CLA_DEVICE},
    Apdu, ApduError, ApduParser, ApduResponse,
};

use crate::command::{check_status, Command, CommandResult, NoErrors};

/// One installed application as reported by the dashboard
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InstalledApp {
    pub flags: u16,
    pub code_hash: Vec<u8>,
    pub full_hash: Vec<u8>,
    pub name: String,
}

/// Enumerate installed applications
///
/// Results arrive in pages: the first page is requested with `continuation`
/// off, further pages with it on, until the device answers with an empty
/// data section.
#[derive(Copy, Clone, Default, Debug)]
pub struct ListAppsCommand {
    pub continuation: bool,
}

impl ListAppsCommand {
    pub fn first() -> Self {
        Self {
            continuation: false,
        }
    }

    pub fn next() -> Self {
        Self { continuation: true }
    }
}

impl Command for ListAppsCommand {
    type Response = Vec<InstalledApp>;
    type ErrorCodes = NoErrors;

    fn name(&self) -> &'static str {
        "ListApps"
    }

    fn apdu(&self) -> Apdu {
        let ins = if self.continuation {
            DeviceInstruction::ListAppsContinue
        } else {
            DeviceInstruction::ListApps
        };
        Apdu::new(CLA_DEVICE, ins.into(), 0x00, 0x00)
    }

    fn parse(&self, response: &ApduResponse) -> CommandResult<Vec<InstalledApp>> {
        check_status(response)?;

        // an empty page terminates the enumeration
        if response.data.is_empty() {
            return Ok(Vec::new());
        }

        let mut p = ApduParser::new(&response.data);

        let format = p.read_u8()?;
        if format != 0x01 {
            return Err(ApduError::InvalidFormat(format).into());
        }

        let mut apps = Vec::new();
        while !p.is_empty() {
            // per-app block length, the fields below add up to it
            let _block_len = p.read_u8()?;
            let flags = p.read_u16()?;
            let code_hash = p.read_bytes(32)?.to_vec();
            let full_hash = p.read_bytes(32)?.to_vec();
            let name = p.read_lv_ascii()?;

            apps.push(InstalledApp {
                flags,
                code_hash,
                full_hash,
                name,
            });
        }

        Ok(apps)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dmk_apdu::StatusWord;

    fn app_block(name: &str, flags: u16) -> Vec<u8> {
        let mut b = vec![(2 + 32 + 32 + 1 + name.len()) as u8];
        b.extend_from_slice(&flags.to_be_bytes());
        b.extend_from_slice(&[0xaa; 32]);
        b.extend_from_slice(&[0xbb; 32]);
        b.push(name.len() as u8);
        b.extend_from_slice(name.as_bytes());
        b
    }

    #[test]
    fn first_and_continuation_apdus() {
        assert_eq!(
            ListAppsCommand::first().apdu().to_bytes(),
            vec![0xe0, 0xde, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            ListAppsCommand::next().apdu().to_bytes(),
            vec![0xe0, 0xdf, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn parses_app_blocks() {
        let mut data = vec![0x01];
        data.extend(app_block("Bitcoin", 0x0013));
        data.extend(app_block("Ethereum", 0x0001));

        let apps = ListAppsCommand::first()
            .parse(&ApduResponse::new(StatusWord::OK, data))
            .unwrap();

        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].name, "Bitcoin");
        assert_eq!(apps[0].flags, 0x0013);
        assert_eq!(apps[0].code_hash, vec![0xaa; 32]);
        assert_eq!(apps[1].name, "Ethereum");
    }

    #[test]
    fn empty_page_ends_enumeration() {
        let apps = ListAppsCommand::next()
            .parse(&ApduResponse::new(StatusWord::OK, vec![]))
            .unwrap();
        assert!(apps.is_empty());
    }

    #[test]
    fn truncated_block_is_a_parse_error() {
        let data = vec![0x01, 0x43, 0x00];
        let r = ListAppsCommand::first().parse(&ApduResponse::new(StatusWord::OK, data));
        assert!(matches!(
            r.unwrap_err(),
            crate::command::CommandError::Parse(ApduError::Underflow)
        ));
    }
}
