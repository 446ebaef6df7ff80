// Copyright (c) 2024-2025 The dmk developers

//! Prelude to simplify downstream use of protocol objects
//!

pub use crate::{
    builder::{Apdu, ApduBuilder, APDU_MAX_DATA},
    error::{ApduError, FramerError, ReceiverError},
    frame::{Frame, FrameHeader, FramerConfig, DEFAULT_FRAME_SIZE, TAG_APDU},
    os::{DashboardInstruction, DeviceInstruction, CLA_DASHBOARD, CLA_DEVICE, DASHBOARD_NAME},
    parser::ApduParser,
    receiver::ApduReceiver,
    response::ApduResponse,
    sender::ApduSender,
    status::StatusWord,
};
