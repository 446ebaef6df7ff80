// Copyright (c) 2024-2025 The dmk developers

//! Response APDU handling

use crate::{error::ApduError, status::StatusWord};

/// A response APDU, data followed by a trailing status word
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ApduResponse {
    pub status: StatusWord,
    pub data: Vec<u8>,
}

impl ApduResponse {
    pub fn new(status: StatusWord, data: Vec<u8>) -> Self {
        Self { status, data }
    }

    /// Split a raw response payload into data and status word
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ApduError> {
        if raw.len() < 2 {
            return Err(ApduError::ResponseTooShort);
        }

        let (data, status) = raw.split_at(raw.len() - 2);
        Ok(Self {
            status: StatusWord(u16::from_be_bytes([status[0], status[1]])),
            data: data.to_vec(),
        })
    }

    /// Serialize back to a raw payload, data then status word
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(self.data.len() + 2);
        b.extend_from_slice(&self.data);
        b.extend_from_slice(&self.status.to_bytes());
        b
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
