// Copyright (c) 2024-2025 The dmk developers

//! Device status flow

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::time::{sleep, Instant};

use crate::{
    action::{ActionContext, DeviceAction, Progress, UserInteractionRequired},
    command::{
        os::{AppAndVersion, GetAppAndVersionCommand, GetOsVersionCommand},
        CommandError,
    },
};

use super::DEFAULT_UNLOCK_TIMEOUT;

/// Delay between polls while waiting for the user to unlock
const UNLOCK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Establish what state the device is in before any real work.
///
/// Checks onboarding, waits for an unlock when one is needed and reports
/// the currently running application. The other OS flows compose this one
/// first.
#[derive(Clone, Debug)]
pub struct GetDeviceStatusAction {
    /// How long to wait for the user to enter their PIN
    pub unlock_timeout: Duration,
}

impl GetDeviceStatusAction {
    pub fn with_timeout(unlock_timeout: Duration) -> Self {
        Self { unlock_timeout }
    }
}

impl Default for GetDeviceStatusAction {
    fn default() -> Self {
        Self {
            unlock_timeout: DEFAULT_UNLOCK_TIMEOUT,
        }
    }
}

/// Everything the status flow can fail with
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum GetDeviceStatusError {
    /// Device never went through onboarding, no seed is present
    #[error("device is not onboarded")]
    DeviceNotOnboarded,

    /// User did not unlock the device in time
    #[error("device stayed locked")]
    DeviceLocked,

    /// A command underneath the flow failed
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[async_trait]
impl DeviceAction for GetDeviceStatusAction {
    type Output = AppAndVersion;
    type Error = GetDeviceStatusError;
    type Intermediate = UserInteractionRequired;

    fn name(&self) -> &'static str {
        "GetDeviceStatus"
    }

    async fn run(
        self,
        ctx: ActionContext,
        progress: Progress<Self::Intermediate>,
    ) -> Result<AppAndVersion, GetDeviceStatusError> {
        // onboarding check; deferred when the OS info cannot be read off
        // a locked device
        let mut os = ctx.state().os;
        if os.is_none() {
            match ctx.send_command(&GetOsVersionCommand).await {
                Ok(info) => {
                    ctx.update_state(|state| state.os = Some(info.clone()));
                    os = Some(info);
                }
                Err(e) if e.is_device_locked() => (),
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(info) = &os {
            if !info.is_onboarded() {
                return Err(GetDeviceStatusError::DeviceNotOnboarded);
            }
        }

        let app = match ctx.send_command(&GetAppAndVersionCommand).await {
            Ok(app) => app,
            Err(e) if e.is_device_locked() => self.await_unlock(&ctx, &progress).await?,
            Err(e) => return Err(e.into()),
        };

        // settle the onboarding check the lock made us skip
        if os.is_none() {
            let info = ctx.send_command(&GetOsVersionCommand).await?;
            if !info.is_onboarded() {
                return Err(GetDeviceStatusError::DeviceNotOnboarded);
            }
            ctx.update_state(|state| state.os = Some(info));
        }

        ctx.update_state(|state| state.current_app = Some(app.clone()));

        Ok(app)
    }
}

impl GetDeviceStatusAction {
    /// Poll until the user unlocks the device or the timeout passes
    async fn await_unlock(
        &self,
        ctx: &ActionContext,
        progress: &Progress<UserInteractionRequired>,
    ) -> Result<AppAndVersion, GetDeviceStatusError> {
        progress.emit(UserInteractionRequired::UnlockDevice);
        debug!("waiting for {} to be unlocked", ctx.device().name);

        let deadline = Instant::now() + self.unlock_timeout;
        loop {
            if Instant::now() >= deadline {
                return Err(GetDeviceStatusError::DeviceLocked);
            }

            sleep(UNLOCK_POLL_INTERVAL).await;

            match ctx.send_command(&GetAppAndVersionCommand).await {
                Ok(app) => return Ok(app),
                Err(e) if e.is_device_locked() => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
