// Copyright (c) 2024-2025 The dmk developers

//! APDU and frame protocol definitions for secure element devices.
//!
//! This crate contains the wire-level building blocks shared by the rest of
//! the workspace: the [`Apdu`] command model with its [`ApduBuilder`] /
//! [`ApduParser`] helpers, [`ApduResponse`] and [`StatusWord`] handling, and
//! the HID-style framing layer ([`ApduSender`] / [`ApduReceiver`]) that
//! chunks APDUs into fixed-size frames and reassembles responses.
//!
//! Everything here is synchronous and I/O free so it can back any transport.

pub mod builder;
pub mod error;
pub mod frame;
pub mod os;
pub mod parser;
pub mod prelude;
pub mod receiver;
pub mod response;
pub mod sender;
pub mod status;

pub use builder::{Apdu, ApduBuilder, APDU_MAX_DATA};
pub use error::{ApduError, FramerError, ReceiverError};
pub use frame::{Frame, FrameHeader, FramerConfig, DEFAULT_FRAME_SIZE, TAG_APDU};
pub use parser::ApduParser;
pub use receiver::ApduReceiver;
pub use response::ApduResponse;
pub use sender::ApduSender;
pub use status::StatusWord;

#[cfg(test)]
pub(crate) mod test {
    use crate::{ApduReceiver, ApduResponse, ApduSender, FramerConfig};

    /// Helper for framing tests, chunks `payload` with a sender and feeds the
    /// frames back through a receiver, expecting completion on the last frame
    pub fn roundtrip(config: FramerConfig, payload: &[u8]) -> ApduResponse {
        let sender = ApduSender::new(config).unwrap();
        let mut receiver = ApduReceiver::new(config);

        let frames = sender.get_frames(payload).unwrap();

        let mut complete = None;
        for (i, f) in frames.iter().enumerate() {
            let r = receiver.handle_frame(&f.to_bytes()).unwrap();
            if i < frames.len() - 1 {
                assert!(r.is_none(), "response completed early at frame {i}");
            } else {
                complete = r;
            }
        }

        complete.expect("no response after final frame")
    }
}
