// Copyright (c) 2024-2025 The dmk developers

use bitflags::bitflags;
use dmk_apdu::{
    os::{DeviceInstruction, CLA_DEVICE},
    Apdu, ApduParser, ApduResponse,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::command::{check_status, Command, CommandResult, NoErrors};

/// Which battery measurement to request, sent in `p2`
#[derive(Copy, Clone, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BatteryStatusType {
    Percentage = 0x00,
    Voltage = 0x01,
    Temperature = 0x02,
    Current = 0x03,
    Flags = 0x04,
}

bitflags! {
    /// Battery and charging state flags
    pub struct BatteryFlags: u32 {
        const CHARGING = 0x0000_0001;
        const USB_POWERED = 0x0000_0002;
        const LOW_BATTERY = 0x0000_0004;
    }
}

/// One battery measurement
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BatteryStatus {
    /// Charge level in percent
    Percentage(u8),
    /// Battery voltage in millivolts
    Voltage(u16),
    /// Temperature in degrees celsius
    Temperature(i8),
    /// Draw in milliamps, negative while discharging
    Current(i8),
    Flags(BatteryFlags),
}

/// Query battery state on battery powered models
#[derive(Copy, Clone, Debug)]
pub struct GetBatteryStatusCommand {
    pub kind: BatteryStatusType,
}

impl GetBatteryStatusCommand {
    pub fn new(kind: BatteryStatusType) -> Self {
        Self { kind }
    }
}

impl Command for GetBatteryStatusCommand {
    type Response = BatteryStatus;
    type ErrorCodes = NoErrors;

    fn name(&self) -> &'static str {
        "GetBatteryStatus"
    }

    fn apdu(&self) -> Apdu {
        Apdu::new(
            CLA_DEVICE,
            DeviceInstruction::GetBatteryStatus.into(),
            0x00,
            self.kind.into(),
        )
    }

    fn parse(&self, response: &ApduResponse) -> CommandResult<BatteryStatus> {
        check_status(response)?;

        let mut p = ApduParser::new(&response.data);

        let status = match self.kind {
            BatteryStatusType::Percentage => BatteryStatus::Percentage(p.read_u8()?),
            BatteryStatusType::Voltage => BatteryStatus::Voltage(p.read_u16()?),
            BatteryStatusType::Temperature => BatteryStatus::Temperature(p.read_u8()? as i8),
            BatteryStatusType::Current => BatteryStatus::Current(p.read_u8()? as i8),
            BatteryStatusType::Flags => {
                BatteryStatus::Flags(BatteryFlags::from_bits_truncate(p.read_u32()?))
            }
        };

        Ok(status)
    }
}
