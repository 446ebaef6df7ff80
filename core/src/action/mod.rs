// Copyright (c) 2024-2025 The dmk developers

//! Device actions
//!
//! A [DeviceAction] is a multi-step device flow a consumer can observe and
//! cancel: opening an application, waiting for an unlock, driving a
//! signature. Actions run against one session, emit intermediate values
//! while they work and finish with exactly one terminal
//! [state](DeviceActionState).
//!
//! Flows compose by running one action inside another and forwarding its
//! intermediates through [Progress::map], so the outer stream always
//! carries a single intermediate type.

use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;
use tokio::sync::watch;

use dmk_apdu::ApduResponse;

use crate::{
    command::{Command, CommandResult},
    device::ConnectedDevice,
    error::TransportError,
    session::{DeviceSessionState, SessionId, SessionInner},
};

mod engine;
pub mod os;
mod state;

pub(crate) use engine::run_action;
pub use engine::{ActionCanceller, ActionState, ActionStates, DeviceActionHandle, Progress};
pub use state::{DeviceActionState, IntermediateValue, UserInteractionRequired};

/// One cancellable multi-step device flow
#[async_trait]
pub trait DeviceAction: Send + 'static {
    /// Value produced on success
    type Output: Send + 'static;
    /// Closed error union of everything that can go wrong
    type Error: Display + Send + 'static;
    /// Intermediate values pushed while the flow runs
    type Intermediate: IntermediateValue + Send + 'static;

    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Drive the flow to its outcome.
    ///
    /// Implementations report intermediate steps through `progress` and
    /// must tolerate being dropped at any await point, which is how
    /// cancellation reaches them.
    async fn run(
        self,
        ctx: ActionContext,
        progress: Progress<Self::Intermediate>,
    ) -> Result<Self::Output, Self::Error>;
}

/// Session capabilities handed to a running action.
///
/// Cheap to clone; all clones address the same session.
#[derive(Clone)]
pub struct ActionContext {
    inner: Arc<SessionInner>,
}

impl ActionContext {
    pub(crate) fn new(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }

    pub fn session_id(&self) -> &SessionId {
        self.inner.id()
    }

    /// Device behind the session
    pub fn device(&self) -> &ConnectedDevice {
        self.inner.device()
    }

    /// Snapshot of the session state
    pub fn state(&self) -> DeviceSessionState {
        self.inner.state()
    }

    /// Subscribe to session state changes
    pub fn observe_state(&self) -> watch::Receiver<DeviceSessionState> {
        self.inner.observe_state()
    }

    /// Persist what the flow learned about the device
    pub fn update_state(&self, f: impl FnOnce(&mut DeviceSessionState)) {
        self.inner.update_state(f)
    }

    /// Send a raw APDU through the session queue
    pub async fn send_apdu(&self, apdu: Vec<u8>) -> Result<ApduResponse, TransportError> {
        self.inner.exchange(apdu, false).await
    }

    /// Send a typed command and parse its response
    pub async fn send_command<C: Command>(
        &self,
        command: &C,
    ) -> CommandResult<C::Response, C::ErrorCodes> {
        self.inner.request(command).await
    }
}
