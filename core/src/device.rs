// Copyright (c) 2024-2025 The dmk developers

//! Device identity and model information

use core::fmt;

use strum::{Display, EnumIter, EnumString};

/// Hardware model of a secure element device
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter)]
pub enum DeviceModel {
    #[strum(serialize = "nanos")]
    NanoS,
    #[strum(serialize = "nanosp")]
    NanoSPlus,
    #[strum(serialize = "nanox")]
    NanoX,
    #[strum(serialize = "stax")]
    Stax,
    #[strum(serialize = "flex")]
    Flex,
}

impl DeviceModel {
    /// Frame size the model uses on its USB HID link
    pub fn usb_frame_size(&self) -> usize {
        64
    }
}

/// Transport-scoped device identifier
///
/// Stable for as long as the transport can see the device, used to find an
/// existing session before opening a second connection to the same unit.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for DeviceId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A device a transport has opened a link to
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConnectedDevice {
    pub id: DeviceId,
    pub name: String,
    pub model: DeviceModel,
}
