// Copyright (c) 2024-2025 The dmk developers

//! Installed application enumeration flow

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::{
    action::{ActionContext, DeviceAction, Progress, UserInteractionRequired},
    command::{
        os::{InstalledApp, ListAppsCommand},
        CommandError,
    },
};

use super::{GoToDashboardAction, GoToDashboardError, DEFAULT_UNLOCK_TIMEOUT};

/// Upper bound on catalogue pages, keeps a misbehaving device from
/// looping us forever
const MAX_PAGES: usize = 16;

/// Enumerate the applications installed on the device.
///
/// Only the dashboard answers the catalogue commands, so the flow heads
/// there first. The device asks the user to allow the listing.
#[derive(Clone, Debug)]
pub struct ListAppsAction {
    /// How long to wait for the user to enter their PIN
    pub unlock_timeout: Duration,
}

impl Default for ListAppsAction {
    fn default() -> Self {
        Self {
            unlock_timeout: DEFAULT_UNLOCK_TIMEOUT,
        }
    }
}

/// Everything the listing flow can fail with
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum ListAppsError {
    /// Reaching the dashboard failed
    #[error(transparent)]
    Dashboard(#[from] GoToDashboardError),

    /// A catalogue command failed
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[async_trait]
impl DeviceAction for ListAppsAction {
    type Output = Vec<InstalledApp>;
    type Error = ListAppsError;
    type Intermediate = UserInteractionRequired;

    fn name(&self) -> &'static str {
        "ListApps"
    }

    async fn run(
        self,
        ctx: ActionContext,
        progress: Progress<Self::Intermediate>,
    ) -> Result<Vec<InstalledApp>, ListAppsError> {
        GoToDashboardAction {
            unlock_timeout: self.unlock_timeout,
        }
        .run(ctx.clone(), progress.clone())
        .await?;

        progress.emit(UserInteractionRequired::AllowListApps);

        let mut apps = Vec::new();
        let mut command = ListAppsCommand::first();

        for _ in 0..MAX_PAGES {
            let page = ctx.send_command(&command).await?;
            if page.is_empty() {
                break;
            }

            apps.extend(page);
            command = ListAppsCommand::next();
        }

        debug!("device lists {} installed apps", apps.len());
        ctx.update_state(|state| state.installed_apps = Some(apps.clone()));

        Ok(apps)
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

    fn page(names: &[&str]) -> Vec<u8> {
        let mut data = vec![0x01];
        for name in names {
            data.push((2 + 32 + 32 + 1 + name.len()) as u8);
            data.extend_from_slice(&0x0000u16.to_be_bytes());
            data.extend_from_slice(&[0xaa; 32]);
            data.extend_from_slice(&[0xbb; 32]);
            data.push(name.len() as u8);
            data.extend_from_slice(name.as_bytes());
        }
        data
    }

    #[tokio::test]
    async fn collects_every_page() {
        let connection = ScriptedConnection::new();
        connection.push_response(&os_reply(true), StatusWord::OK);
        connection.push_response(&app_reply("BOLOS", "1.6.0"), StatusWord::OK);
        connection.push_response(&page(&["Bitcoin", "Exchange"]), StatusWord::OK);
        connection.push_response(&page(&["Solana"]), StatusWord::OK);
        connection.push_response(&[], StatusWord::OK);

        let session = test_session(connection.clone());
        let mut handle = session.execute(ListAppsAction::default());

        assert_eq!(
            handle.next_state().await,
            Some(DeviceActionState::Pending(
                UserInteractionRequired::AllowListApps
            ))
        );

        let DeviceActionState::Completed(apps) = handle.next_state().await.unwrap() else {
            panic!("expected completion");
        };

        let names: Vec<_> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Bitcoin", "Exchange", "Solana"]);

        let installed = session.state().installed_apps.unwrap();
        assert_eq!(installed.len(), 3);

        // first page uses the list instruction, later ones the
        // continuation instruction
        let sent = connection.sent();
        assert_eq!(sent[2][1], 0xde);
        assert_eq!(sent[3][1], 0xdf);
        assert_eq!(sent[4][1], 0xdf);
    }

    #[tokio::test]
    async fn an_empty_device_lists_nothing() {
        let connection = ScriptedConnection::new();
        connection.push_response(&os_reply(true), StatusWord::OK);
        connection.push_response(&app_reply("BOLOS", "1.6.0"), StatusWord::OK);
        connection.push_response(&[], StatusWord::OK);

        let session = test_session(connection);
        let state = session.execute(ListAppsAction::default()).wait().await;

        let DeviceActionState::Completed(apps) = state else {
            panic!("expected completion, got {state:?}");
        };
        assert!(apps.is_empty());
        assert_eq!(session.state().installed_apps, Some(Vec::new()));
    }
}
