// Copyright (c) 2024-2025 The dmk developers

use bitflags::bitflags;
use dmk_apdu::{
    os::{DeviceInstruction, CLA_DEVICE},
    Apdu, ApduParser, ApduResponse,
};

use crate::command::{check_status, Command, CommandResult, NoErrors};

bitflags! {
    /// Secure element state flags, first byte of the OS flag field
    pub struct SeFlags: u8 {
        const RECOVERY_MODE = 0x01;
        const MCU_SIGNED = 0x02;
        const ONBOARDED = 0x04;
        const PIN_VALIDATED = 0x80;
    }
}

/// Operating system identity and state
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OsInfo {
    pub target_id: u32,
    /// Secure element OS version
    pub version: String,
    pub se_flags: SeFlags,
    pub mcu_seph_version: String,
    pub mcu_bootloader_version: String,
}

impl OsInfo {
    pub fn is_onboarded(&self) -> bool {
        self.se_flags.contains(SeFlags::ONBOARDED)
    }
}

/// Query OS version, target and secure element flags
#[derive(Copy, Clone, Default, Debug)]
pub struct GetOsVersionCommand;

impl Command for GetOsVersionCommand {
    type Response = OsInfo;
    type ErrorCodes = NoErrors;

    fn name(&self) -> &'static str {
        "GetOsVersion"
    }

    fn apdu(&self) -> Apdu {
        Apdu::new(
            CLA_DEVICE,
            DeviceInstruction::GetOsVersion.into(),
            0x00,
            0x00,
        )
    }

    fn parse(&self, response: &ApduResponse) -> CommandResult<Self::Response> {
        check_status(response)?;

        let mut p = ApduParser::new(&response.data);

        let target_id = p.read_u32()?;
        let version = p.read_lv_ascii()?;
        let flags = p.read_lv()?;
        let se_flags = SeFlags::from_bits_truncate(flags.first().copied().unwrap_or(0));
        let mcu_seph_version = p.read_lv_ascii()?;
        let mcu_bootloader_version = p.read_lv_ascii()?;

        Ok(OsInfo {
            target_id,
            version,
            se_flags,
            mcu_seph_version,
            mcu_bootloader_version,
        })
    }
}
