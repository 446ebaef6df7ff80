// Copyright (c) 2024-2025 The dmk developers

//! Protocol error types

/// APDU construction / parsing errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ApduError {
    /// APDU data section is limited to [`APDU_MAX_DATA`](crate::APDU_MAX_DATA) bytes
    #[error("APDU data section overflow")]
    DataOverflow,

    /// Attempted to read past the end of a buffer
    #[error("read past end of buffer")]
    Underflow,

    /// String field contains non-ascii bytes
    #[error("invalid ascii in string field")]
    InvalidAscii,

    /// Unexpected format or version byte
    #[error("unexpected format byte 0x{0:02x}")]
    InvalidFormat(u8),

    /// Response payloads must carry at least a status word
    #[error("response shorter than a status word")]
    ResponseTooShort,
}

/// Frame construction (sender side) errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum FramerError {
    /// Frame header does not fit within the configured frame size,
    /// unrecoverable misconfiguration caught at sender construction
    #[error("frame header ({header} bytes) does not fit frame size {frame_size}")]
    Overflow { frame_size: usize, header: usize },

    /// APDU cannot be expressed in frames (length field is 16 bit)
    #[error("APDU of {0} bytes exceeds framable length")]
    ApduTooLarge(usize),
}

/// Frame reassembly (receiver side) errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ReceiverError {
    /// Frame shorter than its expected header
    #[error("truncated frame ({0} bytes)")]
    Truncated(usize),

    /// Continuation frame arrived out of order
    #[error("unexpected frame sequence (expected {expected}, got {actual})")]
    UnexpectedSequence { expected: u16, actual: u16 },

    /// Continuation frame arrived with no reassembly in progress
    #[error("continuation frame without a leading frame")]
    MissingLength,

    /// Declared response length cannot hold a status word
    #[error("declared response length {0} too short")]
    Underflow(usize),
}
