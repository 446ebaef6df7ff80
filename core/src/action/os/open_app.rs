// Copyright (c) 2024-2025 The dmk developers

//! Open application flow

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::{
    action::{ActionContext, DeviceAction, Progress, UserInteractionRequired},
    command::{
        os::{
            AppAndVersion, CloseAppCommand, GetAppAndVersionCommand, OpenAppCommand,
            OpenAppErrorCodes,
        },
        CommandError,
    },
};

use super::{GetDeviceStatusAction, GetDeviceStatusError, DEFAULT_UNLOCK_TIMEOUT};

/// Rounds of the close/open decision before the flow gives up
const MAX_OPEN_ATTEMPTS: usize = 3;

/// Bring the requested application to the foreground.
///
/// Establishes device status first, then closes whatever else is running,
/// asks the device to open the application and verifies the outcome.
/// Opening requires user confirmation on the device.
#[derive(Clone, Debug)]
pub struct OpenAppAction {
    /// Application to open, as registered on the device
    pub app_name: String,
    /// How long to wait for the user to enter their PIN
    pub unlock_timeout: Duration,
}

impl OpenAppAction {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            unlock_timeout: DEFAULT_UNLOCK_TIMEOUT,
        }
    }
}

/// Everything the open flow can fail with
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum OpenAppError {
    /// Requested name is empty or not representable in an APDU
    #[error("application name is empty or not ascii")]
    InvalidName,

    /// User refused the open prompt on the device
    #[error("user refused to open {0}")]
    Refused(String),

    /// Device has no application under that name
    #[error("application {0} is not installed")]
    NotInstalled(String),

    /// Device kept landing in a different application
    #[error("expected {expected} to be running, found {actual}")]
    UnexpectedApp { expected: String, actual: String },

    /// Establishing device status failed
    #[error(transparent)]
    DeviceStatus(#[from] GetDeviceStatusError),

    /// A command underneath the flow failed
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[async_trait]
impl DeviceAction for OpenAppAction {
    type Output = AppAndVersion;
    type Error = OpenAppError;
    type Intermediate = UserInteractionRequired;

    fn name(&self) -> &'static str {
        "OpenApp"
    }

    async fn run(
        self,
        ctx: ActionContext,
        progress: Progress<Self::Intermediate>,
    ) -> Result<AppAndVersion, OpenAppError> {
        let open = OpenAppCommand::new(&self.app_name).map_err(|_| OpenAppError::InvalidName)?;

        let mut app = GetDeviceStatusAction::with_timeout(self.unlock_timeout)
            .run(ctx.clone(), progress.clone())
            .await?;

        for _ in 0..MAX_OPEN_ATTEMPTS {
            if app.name == self.app_name {
                ctx.update_state(|state| state.current_app = Some(app.clone()));
                return Ok(app);
            }

            if app.is_dashboard() {
                debug!("opening {}", self.app_name);
                progress.emit(UserInteractionRequired::ConfirmOpenApp);
                if let Err(e) = ctx.send_command(&open).await {
                    return Err(self.map_open_error(e));
                }
            } else {
                // something else is running, head back to the dashboard
                debug!("closing {} first", app.name);
                ctx.send_command(&CloseAppCommand).await?;
            }

            app = ctx.send_command(&GetAppAndVersionCommand).await?;
        }

        Err(OpenAppError::UnexpectedApp {
            expected: self.app_name,
            actual: app.name,
        })
    }
}

impl OpenAppAction {
    fn map_open_error(&self, e: CommandError<OpenAppErrorCodes>) -> OpenAppError {
        match e {
            CommandError::App(OpenAppErrorCodes::Refused) => {
                OpenAppError::Refused(self.app_name.clone())
            }
            CommandError::App(OpenAppErrorCodes::NotInstalled) => {
                OpenAppError::NotInstalled(self.app_name.clone())
            }
            CommandError::Global(e) => OpenAppError::Command(CommandError::Global(e)),
            CommandError::Parse(e) => OpenAppError::Command(CommandError::Parse(e)),
            CommandError::Transport(e) => OpenAppError::Command(CommandError::Transport(e)),
        }
    }
}
