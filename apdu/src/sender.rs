// Copyright (c) 2024-2025 The dmk developers

//! APDU to frame chunking

use log::trace;

use crate::{
    error::FramerError,
    frame::{Frame, FrameHeader, FramerConfig},
};

/// Chunks serialized APDUs into transport frames per a [`FramerConfig`]
///
/// Construction fails when the first-frame header leaves no payload
/// capacity, which can only be a misconfigured frame size.
#[derive(Copy, Clone, Debug)]
pub struct ApduSender {
    config: FramerConfig,
}

impl ApduSender {
    pub fn new(config: FramerConfig) -> Result<Self, FramerError> {
        let header = config.header_len(0);
        if header >= config.frame_size {
            return Err(FramerError::Overflow {
                frame_size: config.frame_size,
                header,
            });
        }

        Ok(Self { config })
    }

    /// Split `apdu` into ordered frames
    ///
    /// The first frame declares the total length, continuation frames carry
    /// an incrementing sequence index. An empty APDU still produces one
    /// frame. With padding enabled every payload is zero-filled to capacity.
    pub fn get_frames(&self, apdu: &[u8]) -> Result<Vec<Frame>, FramerError> {
        if apdu.len() > u16::MAX as usize {
            return Err(FramerError::ApduTooLarge(apdu.len()));
        }

        let mut frames = Vec::new();
        let mut offset = 0;
        let mut seq = 0u16;

        loop {
            let header = FrameHeader {
                channel: self.config.channel,
                seq,
                length: (seq == 0).then_some(apdu.len() as u16),
            };

            let capacity = self.config.frame_size - header.byte_len();
            let end = usize::min(offset + capacity, apdu.len());

            let mut data = apdu[offset..end].to_vec();
            if self.config.padding {
                data.resize(capacity, 0);
            }

            frames.push(Frame { header, data });

            offset = end;
            if offset >= apdu.len() {
                break;
            }
            seq = seq
                .checked_add(1)
                .ok_or(FramerError::ApduTooLarge(apdu.len()))?;
        }

        trace!("framed {} byte APDU into {} frames", apdu.len(), frames.len());

        Ok(frames)
    }
}
