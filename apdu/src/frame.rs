// Copyright (c) 2024-2025 The dmk developers

//! HID-style frame layout
//!
//! APDUs travel in fixed-size frames of
//! `[channel: u16]? [tag: u8] [seq: u16] [length: u16]? payload`,
//! all integers big-endian. The channel pair is only present when the
//! transport multiplexes (USB HID does, some links do not), `length` is the
//! total APDU length and only present on the first frame (`seq == 0`).

use byteorder::{BigEndian, ByteOrder};

/// Tag byte marking an APDU frame
pub const TAG_APDU: u8 = 0x05;

/// Frame size used by USB HID class devices
pub const DEFAULT_FRAME_SIZE: usize = 64;

/// Framing parameters for one transport link
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct FramerConfig {
    /// Channel identifier, two bytes prepended to each frame when set
    pub channel: Option<u16>,
    /// Fixed serialized frame size in bytes
    pub frame_size: usize,
    /// Zero-pad payloads so every frame serializes to `frame_size`
    pub padding: bool,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            channel: None,
            frame_size: DEFAULT_FRAME_SIZE,
            padding: false,
        }
    }
}

impl FramerConfig {
    /// Header width of the frame carrying `seq`
    pub fn header_len(&self, seq: u16) -> usize {
        let channel = if self.channel.is_some() { 2 } else { 0 };
        let length = if seq == 0 { 2 } else { 0 };
        // channel? + tag + seq + length?
        channel + 1 + 2 + length
    }
}

/// Header of a single frame
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct FrameHeader {
    pub channel: Option<u16>,
    pub seq: u16,
    /// Total APDU length, first frame only
    pub length: Option<u16>,
}

impl FrameHeader {
    pub fn byte_len(&self) -> usize {
        let channel = if self.channel.is_some() { 2 } else { 0 };
        let length = if self.length.is_some() { 2 } else { 0 };
        channel + 1 + 2 + length
    }

    fn write(&self, buf: &mut Vec<u8>) {
        if let Some(c) = self.channel {
            buf.extend_from_slice(&c.to_be_bytes());
        }
        buf.push(TAG_APDU);
        buf.extend_from_slice(&self.seq.to_be_bytes());
        if let Some(l) = self.length {
            buf.extend_from_slice(&l.to_be_bytes());
        }
    }
}

/// One frame, header plus (possibly padded) payload
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    pub header: FrameHeader,
    pub data: Vec<u8>,
}

impl Frame {
    /// Serialize for transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(self.header.byte_len() + self.data.len());
        self.header.write(&mut b);
        b.extend_from_slice(&self.data);
        b
    }
}

/// Read the big-endian u16 at `offset`, if present
pub(crate) fn read_u16(raw: &[u8], offset: usize) -> Option<u16> {
    raw.get(offset..offset + 2).map(BigEndian::read_u16)
}
