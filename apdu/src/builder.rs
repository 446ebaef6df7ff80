// Copyright (c) 2024-2025 The dmk developers

//! APDU command model and builder

use crate::error::ApduError;

/// Maximum length of an APDU data section
pub const APDU_MAX_DATA: usize = 255;

/// A command APDU in ISO 7816-4 short form
///
/// Serialized as `cla ins p1 p2 Lc data`, with `Lc` always present
/// (zero for data-less commands).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Apdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl Apdu {
    /// Create a data-less APDU
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
        }
    }

    /// Serialize for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(5 + self.data.len());
        b.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
        b.extend_from_slice(&self.data);
        b
    }

    /// Decode a serialized command, the device side of [`to_bytes`](Self::to_bytes)
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ApduError> {
        if raw.len() < 5 {
            return Err(ApduError::Underflow);
        }

        let lc = raw[4] as usize;
        let data = raw.get(5..5 + lc).ok_or(ApduError::Underflow)?;

        Ok(Self {
            cla: raw[0],
            ins: raw[1],
            p1: raw[2],
            p2: raw[3],
            data: data.to_vec(),
        })
    }
}

/// Incremental [`Apdu`] construction with length checking
///
/// ```
/// # use dmk_apdu::{ApduBuilder, ApduError};
/// let apdu = ApduBuilder::new(0xe0, 0xd8, 0x00, 0x00)
///     .push_ascii("Bitcoin")?
///     .build();
/// assert_eq!(apdu.to_bytes()[4], 7);
/// # Ok::<(), ApduError>(())
/// ```
#[derive(Clone, Debug)]
pub struct ApduBuilder {
    apdu: Apdu,
}

impl ApduBuilder {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            apdu: Apdu::new(cla, ins, p1, p2),
        }
    }

    fn push(mut self, bytes: &[u8]) -> Result<Self, ApduError> {
        if self.apdu.data.len() + bytes.len() > APDU_MAX_DATA {
            return Err(ApduError::DataOverflow);
        }
        self.apdu.data.extend_from_slice(bytes);
        Ok(self)
    }

    pub fn push_u8(self, v: u8) -> Result<Self, ApduError> {
        self.push(&[v])
    }

    pub fn push_u16(self, v: u16) -> Result<Self, ApduError> {
        self.push(&v.to_be_bytes())
    }

    pub fn push_u32(self, v: u32) -> Result<Self, ApduError> {
        self.push(&v.to_be_bytes())
    }

    pub fn push_slice(self, v: &[u8]) -> Result<Self, ApduError> {
        self.push(v)
    }

    /// Append an ascii string without length prefix
    pub fn push_ascii(self, v: &str) -> Result<Self, ApduError> {
        if !v.is_ascii() {
            return Err(ApduError::InvalidAscii);
        }
        self.push(v.as_bytes())
    }

    /// Append a length-prefixed field, the write side of
    /// [`ApduParser::read_lv`](crate::ApduParser::read_lv)
    pub fn push_lv(self, v: &[u8]) -> Result<Self, ApduError> {
        if v.len() > u8::MAX as usize {
            return Err(ApduError::DataOverflow);
        }
        self.push_u8(v.len() as u8)?.push_slice(v)
    }

    pub fn build(self) -> Apdu {
        self.apdu
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dataless_apdu_keeps_lc() {
        let apdu = Apdu::new(0xb0, 0x01, 0x00, 0x00);
        assert_eq!(apdu.to_bytes(), vec![0xb0, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn decodes_what_it_serialized() {
        let apdu = ApduBuilder::new(0xe0, 0xd8, 0x00, 0x00)
            .push_ascii("Bitcoin")
            .unwrap()
            .build();

        assert_eq!(Apdu::from_bytes(&apdu.to_bytes()).unwrap(), apdu);
    }

    #[test]
    fn short_commands_fail_to_decode() {
        assert_eq!(Apdu::from_bytes(&[0xe0, 0x01]).unwrap_err(), ApduError::Underflow);
        // lc larger than the remaining payload
        assert_eq!(
            Apdu::from_bytes(&[0xe0, 0xd8, 0x00, 0x00, 0x03, b'B']).unwrap_err(),
            ApduError::Underflow
        );
    }

    #[test]
    fn builder_appends_fields() {
        let apdu = ApduBuilder::new(0xe0, 0xd8, 0x00, 0x00)
            .push_ascii("BOLOS")
            .unwrap()
            .build();

        assert_eq!(
            apdu.to_bytes(),
            vec![0xe0, 0xd8, 0x00, 0x00, 0x05, b'B', b'O', b'L', b'O', b'S']
        );
    }

    #[test]
    fn lv_fields_carry_their_length() {
        let apdu = ApduBuilder::new(0xe0, 0x00, 0x00, 0x00)
            .push_lv(b"BTC")
            .unwrap()
            .build();

        assert_eq!(apdu.data, vec![0x03, b'B', b'T', b'C']);
    }

    #[test]
    fn builder_rejects_overflow() {
        let b = ApduBuilder::new(0x00, 0x00, 0x00, 0x00)
            .push_slice(&[0u8; APDU_MAX_DATA])
            .unwrap();

        assert_eq!(b.push_u8(0).unwrap_err(), ApduError::DataOverflow);
    }

    #[test]
    fn builder_rejects_non_ascii() {
        let r = ApduBuilder::new(0x00, 0x00, 0x00, 0x00).push_ascii("héllo");
        assert_eq!(r.unwrap_err(), ApduError::InvalidAscii);
    }
}
