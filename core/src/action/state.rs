// Copyright (c) 2024-2025 The dmk developers

//! Action progress states

use strum::Display;

/// Externally observable progress of one running action.
///
/// A consumer sees zero or more `Pending` values followed by exactly one
/// terminal state, after which the stream completes. Nothing is ever
/// emitted after a terminal state.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceActionState<O, E, I> {
    /// Intermediate step, possibly waiting on the user
    Pending(I),
    /// Cancelled before reaching an outcome
    Stopped,
    /// Finished with an output
    Completed(O),
    /// Finished with an error
    Errored(E),
}

impl<O, E, I> DeviceActionState<O, E, I> {
    /// Whether this state ends the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

/// What the user must currently do on the device for a flow to proceed
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum UserInteractionRequired {
    /// Nothing, the flow advances on its own
    #[strum(serialize = "none")]
    None,
    /// Enter the PIN
    #[strum(serialize = "unlock-device")]
    UnlockDevice,
    /// Approve opening the requested application
    #[strum(serialize = "confirm-open-app")]
    ConfirmOpenApp,
    /// Approve listing installed applications
    #[strum(serialize = "allow-list-apps")]
    AllowListApps,
    /// Compare and confirm an address on screen
    #[strum(serialize = "verify-address")]
    VerifyAddress,
    /// Review and approve a transaction
    #[strum(serialize = "sign-transaction")]
    SignTransaction,
    /// Review and approve structured data
    #[strum(serialize = "sign-typed-data")]
    SignTypedData,
    /// Approve wallet registration
    #[strum(serialize = "register-wallet")]
    RegisterWallet,
}

/// Every intermediate value names the interaction it waits on, so a
/// consumer can render prompts without knowing which sub-flow is active
pub trait IntermediateValue {
    fn required_user_interaction(&self) -> UserInteractionRequired;
}

impl IntermediateValue for UserInteractionRequired {
    fn required_user_interaction(&self) -> UserInteractionRequired {
        *self
    }
}
