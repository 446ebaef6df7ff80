// Copyright (c) 2024-2025 The dmk developers

//! Return to dashboard flow

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::{
    action::{ActionContext, DeviceAction, Progress, UserInteractionRequired},
    command::{
        os::{AppAndVersion, CloseAppCommand, GetAppAndVersionCommand},
        CommandError,
    },
};

use super::{GetDeviceStatusAction, GetDeviceStatusError, DEFAULT_UNLOCK_TIMEOUT};

/// Close whatever application is running until the dashboard answers
#[derive(Clone, Debug)]
pub struct GoToDashboardAction {
    /// How long to wait for the user to enter their PIN
    pub unlock_timeout: Duration,
}

impl Default for GoToDashboardAction {
    fn default() -> Self {
        Self {
            unlock_timeout: DEFAULT_UNLOCK_TIMEOUT,
        }
    }
}

/// Everything the dashboard flow can fail with
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum GoToDashboardError {
    /// Device kept an application in the foreground after closing
    #[error("device did not return to the dashboard, {0} is running")]
    StuckInApp(String),

    /// Establishing device status failed
    #[error(transparent)]
    DeviceStatus(#[from] GetDeviceStatusError),

    /// A command underneath the flow failed
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[async_trait]
impl DeviceAction for GoToDashboardAction {
    type Output = AppAndVersion;
    type Error = GoToDashboardError;
    type Intermediate = UserInteractionRequired;

    fn name(&self) -> &'static str {
        "GoToDashboard"
    }

    async fn run(
        self,
        ctx: ActionContext,
        progress: Progress<Self::Intermediate>,
    ) -> Result<AppAndVersion, GoToDashboardError> {
        let app = GetDeviceStatusAction::with_timeout(self.unlock_timeout)
            .run(ctx.clone(), progress.clone())
            .await?;

        if app.is_dashboard() {
            return Ok(app);
        }

        debug!("closing {}", app.name);
        ctx.send_command(&CloseAppCommand).await?;

        let app = ctx.send_command(&GetAppAndVersionCommand).await?;
        if !app.is_dashboard() {
            return Err(GoToDashboardError::StuckInApp(app.name));
        }

        ctx.update_state(|state| state.current_app = Some(app.clone()));

        Ok(app)
    }
}

#[cfg(test)]
mod test {
    use dmk_apdu::StatusWord;

    use super::*;
    use crate::{
        action::DeviceActionState,
        session::{DeviceSession, RefresherOptions, SessionConfig},
        test::{app_reply, os_reply, test_device, ScriptedConnection},
    };

    fn test_session(connection: ScriptedConnection) -> DeviceSession {
        DeviceSession::new(
            test_device(),
            connection,
            SessionConfig {
                refresher: RefresherOptions::off(),
            },
        )
    }

    #[tokio::test]
    async fn already_on_the_dashboard() {
        let connection = ScriptedConnection::new();
        connection.push_response(&os_reply(true), StatusWord::OK);
        connection.push_response(&app_reply("BOLOS", "1.6.0"), StatusWord::OK);

        let session = test_session(connection.clone());
        let state = session.execute(GoToDashboardAction::default()).wait().await;

        let DeviceActionState::Completed(app) = state else {
            panic!("expected completion, got {state:?}");
        };
        assert!(app.is_dashboard());
        assert_eq!(connection.sent().len(), 2);
    }

    #[tokio::test]
    async fn closes_the_running_app() {
        let connection = ScriptedConnection::new();
        connection.push_response(&os_reply(true), StatusWord::OK);
        connection.push_response(&app_reply("Bitcoin", "2.4.1"), StatusWord::OK);
        connection.push_response(&[], StatusWord::OK); // close
        connection.push_response(&app_reply("BOLOS", "1.6.0"), StatusWord::OK);

        let session = test_session(connection);
        let state = session.execute(GoToDashboardAction::default()).wait().await;

        assert!(matches!(state, DeviceActionState::Completed(_)));
        assert_eq!(session.state().current_app.unwrap().name, "BOLOS");
    }

    #[tokio::test]
    async fn surfaces_a_device_that_will_not_leave() {
        let connection = ScriptedConnection::new();
        connection.push_response(&os_reply(true), StatusWord::OK);
        connection.push_response(&app_reply("Bitcoin", "2.4.1"), StatusWord::OK);
        connection.push_response(&[], StatusWord::OK); // close
        connection.push_response(&app_reply("Bitcoin", "2.4.1"), StatusWord::OK);

        let session = test_session(connection);
        let state = session.execute(GoToDashboardAction::default()).wait().await;

        assert_eq!(
            state,
            DeviceActionState::Errored(GoToDashboardError::StuckInApp("Bitcoin".to_string()))
        );
    }
}
