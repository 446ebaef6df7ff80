// Copyright (c) 2024-2025 The dmk developers

//! Frame to APDU response reassembly

use log::trace;

use crate::{
    error::ReceiverError,
    frame::{read_u16, FramerConfig},
    response::ApduResponse,
    status::StatusWord,
};

/// Accumulates device frames back into [`ApduResponse`]s
///
/// One command-response cycle at a time: a first frame (`seq == 0`) declares
/// the total length and resets any previous accumulation, continuation
/// frames must arrive strictly in order. Channel and tag bytes are written
/// by the device echoing the request and only skipped here.
#[derive(Clone, Debug)]
pub struct ApduReceiver {
    config: FramerConfig,
    pending: Option<Pending>,
}

#[derive(Clone, Debug)]
struct Pending {
    length: usize,
    data: Vec<u8>,
    next_seq: u16,
}

impl ApduReceiver {
    pub fn new(config: FramerConfig) -> Self {
        Self {
            config,
            pending: None,
        }
    }

    /// Ingest one raw frame
    ///
    /// Returns `Ok(Some(_))` exactly when the declared length has been
    /// accumulated, afterwards the receiver is ready for the next cycle.
    pub fn handle_frame(&mut self, raw: &[u8]) -> Result<Option<ApduResponse>, ReceiverError> {
        // channel (when configured) + tag
        let mut offset = if self.config.channel.is_some() { 2 } else { 0 };
        offset += 1;

        let seq = read_u16(raw, offset).ok_or(ReceiverError::Truncated(raw.len()))?;
        offset += 2;

        if seq == 0 {
            let length =
                read_u16(raw, offset).ok_or(ReceiverError::Truncated(raw.len()))? as usize;
            offset += 2;

            if length < 2 {
                return Err(ReceiverError::Underflow(length));
            }

            trace!("response start, {length} bytes declared");
            self.pending = Some(Pending {
                length,
                data: Vec::with_capacity(length),
                next_seq: 1,
            });
        } else {
            let pending = self.pending.as_mut().ok_or(ReceiverError::MissingLength)?;
            if seq != pending.next_seq {
                let expected = pending.next_seq;
                // a broken sequence poisons the whole cycle
                self.pending = None;
                return Err(ReceiverError::UnexpectedSequence {
                    expected,
                    actual: seq,
                });
            }
            pending.next_seq += 1;
        }

        // unwrap is fine, both branches above leave an accumulation in place
        let pending = self.pending.as_mut().unwrap();

        let payload = raw.get(offset..).unwrap_or(&[]);
        let needed = pending.length - pending.data.len();
        let take = usize::min(needed, payload.len());
        pending.data.extend_from_slice(&payload[..take]);

        if pending.data.len() < pending.length {
            return Ok(None);
        }

        let done = self.pending.take().unwrap();
        let split = done.length - 2;
        let status = StatusWord(u16::from_be_bytes([done.data[split], done.data[split + 1]]));

        trace!("response complete, status {status}");

        Ok(Some(ApduResponse::new(
            status,
            done.data[..split].to_vec(),
        )))
    }
}
