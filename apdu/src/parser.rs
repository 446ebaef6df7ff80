// Copyright (c) 2024-2025 The dmk developers

//! Cursor-style reader for APDU response payloads

use crate::error::ApduError;

/// Sequential reader over a response data section
///
/// All multi-byte fields are big-endian, string fields are ascii, length
/// prefixed fields (`LV`) carry a single length byte.
pub struct ApduParser<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ApduParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ApduError> {
        let end = self.offset.checked_add(n).ok_or(ApduError::Underflow)?;
        let s = self.data.get(self.offset..end).ok_or(ApduError::Underflow)?;
        self.offset = end;
        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8, ApduError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ApduError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ApduError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a length-prefixed field
    pub fn read_lv(&mut self) -> Result<&'a [u8], ApduError> {
        let n = self.read_u8()? as usize;
        self.read_bytes(n)
    }

    /// Read a length-prefixed ascii string
    pub fn read_lv_ascii(&mut self) -> Result<String, ApduError> {
        let b = self.read_lv()?;
        if !b.is_ascii() {
            return Err(ApduError::InvalidAscii);
        }
        // trailing NUL terminators appear in some OS fields
        let end = b.iter().position(|c| *c == 0).unwrap_or(b.len());
        Ok(String::from_utf8_lossy(&b[..end]).into_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_scalars_big_endian() {
        let mut p = ApduParser::new(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);

        assert_eq!(p.read_u8().unwrap(), 0x01);
        assert_eq!(p.read_u16().unwrap(), 0x0203);
        assert_eq!(p.read_u32().unwrap(), 0x04050607);
        assert!(p.is_empty());
    }

    #[test]
    fn reads_lv_fields() {
        let mut p = ApduParser::new(&[0x03, b'B', b'T', b'C', 0x00]);

        assert_eq!(p.read_lv_ascii().unwrap(), "BTC");
        assert_eq!(p.remaining(), 1);
    }

    #[test]
    fn underflow_is_an_error() {
        let mut p = ApduParser::new(&[0x01]);

        assert_eq!(p.read_u16().unwrap_err(), ApduError::Underflow);
        // a failed read consumes nothing
        assert_eq!(p.read_u8().unwrap(), 0x01);
    }

    #[test]
    fn lv_length_beyond_buffer_is_an_error() {
        let mut p = ApduParser::new(&[0x05, b'a']);
        assert_eq!(p.read_lv().unwrap_err(), ApduError::Underflow);
    }
}
