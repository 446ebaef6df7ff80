// Copyright (c) 2024-2025 The dmk developers

//! Open an application and dispatch one command inside it

use core::fmt::{Debug, Display};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    action::{ActionContext, DeviceAction, Progress, UserInteractionRequired},
    command::{Command, CommandError, NoErrors},
};

use super::{OpenAppAction, OpenAppError, DEFAULT_UNLOCK_TIMEOUT};

/// Run one application command with the open-app plumbing taken care of.
///
/// The flow brings the requested application to the foreground (unlocking
/// and closing whatever else is open along the way), then dispatches the
/// wrapped command and completes with its parsed response. Commands that
/// make the device prompt the user declare it with [expecting](Self::expecting)
/// so consumers can drive their UI from the intermediate.
#[derive(Clone, Debug)]
pub struct SendCommandInAppAction<C> {
    /// Application that must be frontmost when the command is sent
    pub app_name: String,
    /// Command to dispatch once the application is open
    pub command: C,
    /// Prompt the command raises on the device, if any
    pub user_interaction: UserInteractionRequired,
    /// How long to wait for the user to enter their PIN
    pub unlock_timeout: Duration,
}

impl<C> SendCommandInAppAction<C> {
    pub fn new(app_name: impl Into<String>, command: C) -> Self {
        Self {
            app_name: app_name.into(),
            command,
            user_interaction: UserInteractionRequired::None,
            unlock_timeout: DEFAULT_UNLOCK_TIMEOUT,
        }
    }

    /// Declare the on-device prompt the command will raise
    pub fn expecting(mut self, interaction: UserInteractionRequired) -> Self {
        self.user_interaction = interaction;
        self
    }
}

/// Everything the wrapped dispatch can fail with
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum SendCommandInAppError<E: Display + Debug = NoErrors> {
    /// The application could not be brought to the foreground
    #[error(transparent)]
    OpenApp(OpenAppError),

    /// The command itself failed
    #[error(transparent)]
    Command(CommandError<E>),
}

#[async_trait]
impl<C> DeviceAction for SendCommandInAppAction<C>
where
    C: Command + 'static,
    C::Response: 'static,
    C::ErrorCodes: 'static,
{
    type Output = C::Response;
    type Error = SendCommandInAppError<C::ErrorCodes>;
    type Intermediate = UserInteractionRequired;

    fn name(&self) -> &'static str {
        "SendCommandInApp"
    }

    async fn run(
        self,
        ctx: ActionContext,
        progress: Progress<Self::Intermediate>,
    ) -> Result<C::Response, Self::Error> {
        OpenAppAction {
            app_name: self.app_name,
            unlock_timeout: self.unlock_timeout,
        }
        .run(ctx.clone(), progress.clone())
        .await
        .map_err(SendCommandInAppError::OpenApp)?;

        if self.user_interaction != UserInteractionRequired::None {
            progress.emit(self.user_interaction);
        }

        ctx.send_command(&self.command)
            .await
            .map_err(SendCommandInAppError::Command)
    }
}
