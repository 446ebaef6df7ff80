// Copyright (c) 2024-2025 The dmk developers

//! Periodic poll keeping session state in sync with the device

use std::{sync::Arc, time::Duration};

use log::debug;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::SessionInner;

/// Smallest polling period the refresher will run at
pub const MIN_POLLING_INTERVAL: Duration = Duration::from_millis(1000);

/// Schedule for one session's background poll
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RefresherOptions {
    /// Delay between polls, never below [MIN_POLLING_INTERVAL]
    pub polling_interval: Duration,
    /// Do not poll at all
    pub disabled: bool,
}

impl RefresherOptions {
    /// Normalise a raw interval in milliseconds.
    ///
    /// Values below the minimum clamp up to it, except that `0` keeps the
    /// default schedule and switches the poller off instead.
    pub fn from_interval_ms(ms: u64) -> Self {
        if ms == 0 {
            return Self {
                polling_interval: MIN_POLLING_INTERVAL,
                disabled: true,
            };
        }

        Self {
            polling_interval: MIN_POLLING_INTERVAL.max(Duration::from_millis(ms)),
            disabled: false,
        }
    }

    /// Default schedule with polling switched off
    pub fn off() -> Self {
        Self {
            disabled: true,
            ..Default::default()
        }
    }
}

impl Default for RefresherOptions {
    fn default() -> Self {
        Self {
            polling_interval: MIN_POLLING_INTERVAL,
            disabled: false,
        }
    }
}

/// Spawn the poll loop for a session
pub(super) fn spawn(inner: Arc<SessionInner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(run(inner, period))
}

async fn run(inner: Arc<SessionInner>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately, consume it so the first poll
    // lands one full period after connect
    interval.tick().await;

    debug!(
        "session {} polling every {}ms",
        inner.id(),
        period.as_millis()
    );

    loop {
        interval.tick().await;

        if inner.is_closed() || !inner.refresh().await {
            break;
        }
    }

    debug!("session {} refresher stopped", inner.id());
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_interval_disables_polling() {
        let options = RefresherOptions::from_interval_ms(0);

        assert_eq!(options.polling_interval, MIN_POLLING_INTERVAL);
        assert!(options.disabled);
    }

    #[test]
    fn short_intervals_clamp_to_minimum() {
        let options = RefresherOptions::from_interval_ms(500);

        assert_eq!(options.polling_interval, MIN_POLLING_INTERVAL);
        assert!(!options.disabled);
    }

    #[test]
    fn long_intervals_pass_through() {
        let options = RefresherOptions::from_interval_ms(5000);

        assert_eq!(options.polling_interval, Duration::from_millis(5000));
        assert!(!options.disabled);
    }
}
