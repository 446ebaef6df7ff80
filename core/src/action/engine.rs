// Copyright (c) 2024-2025 The dmk developers

//! Action execution engine
//!
//! [run_action] drives one [DeviceAction] in a spawned task, forwarding its
//! intermediate values as `Pending` states and closing the stream right
//! after the single terminal state.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::Stream;
use log::debug;
use tokio::sync::{mpsc, watch};

use super::{ActionContext, DeviceAction, DeviceActionState};
use crate::session::SessionInner;

/// State type of action `A`
pub type ActionState<A> = DeviceActionState<
    <A as DeviceAction>::Output,
    <A as DeviceAction>::Error,
    <A as DeviceAction>::Intermediate,
>;

/// Pushes intermediate values from a running flow into its state stream
pub struct Progress<I> {
    emit: Arc<dyn Fn(I) + Send + Sync>,
}

impl<I> Clone for Progress<I> {
    fn clone(&self) -> Self {
        Self {
            emit: self.emit.clone(),
        }
    }
}

impl<I: Send + 'static> Progress<I> {
    /// Report an intermediate step
    pub fn emit(&self, value: I) {
        (self.emit)(value)
    }

    /// Adapt a sub-flow's intermediate type into this one.
    ///
    /// The mapped handle feeds the same stream, which is what makes a
    /// composed action look like a single flow to its consumer.
    pub fn map<J: Send + 'static>(
        &self,
        f: impl Fn(J) -> I + Send + Sync + 'static,
    ) -> Progress<J> {
        let emit = self.emit.clone();
        Progress {
            emit: Arc::new(move |value| (emit)(f(value))),
        }
    }
}

/// Stream of states for one action run, ends right after the terminal state
pub struct ActionStates<A: DeviceAction> {
    rx: mpsc::UnboundedReceiver<ActionState<A>>,
}

impl<A: DeviceAction> ActionStates<A> {
    /// Next state, `None` once the stream completed
    pub async fn next(&mut self) -> Option<ActionState<A>> {
        self.rx.recv().await
    }
}

impl<A: DeviceAction> Stream for ActionStates<A> {
    type Item = ActionState<A>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Requests cooperative cancellation of one action run
#[derive(Clone)]
pub struct ActionCanceller {
    cancel: Arc<watch::Sender<bool>>,
}

impl ActionCanceller {
    /// Stop the run.
    ///
    /// The flow is dropped at its next await point; an exchange already on
    /// the wire completes inside the connection and its result is
    /// discarded. The device connection stays open. A no-op once the run
    /// reached a terminal state.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }
}

/// A started action: its state stream plus cancellation
pub struct DeviceActionHandle<A: DeviceAction> {
    /// States in emission order, ending with exactly one terminal state
    pub states: ActionStates<A>,
    /// Cancels this run, clonable and usable from anywhere
    pub canceller: ActionCanceller,
}

impl<A: DeviceAction> DeviceActionHandle<A> {
    /// Next state, `None` once the stream completed
    pub async fn next_state(&mut self) -> Option<ActionState<A>> {
        self.states.next().await
    }

    /// Request cancellation of this run
    pub fn cancel(&self) {
        self.canceller.cancel()
    }

    /// Drain the stream and return the terminal state
    pub async fn wait(mut self) -> ActionState<A> {
        loop {
            match self.states.next().await {
                Some(state) if state.is_terminal() => return state,
                Some(_) => continue,
                // the engine emits a terminal state before closing; a
                // vanished stream can only mean the run was torn down
                None => return DeviceActionState::Stopped,
            }
        }
    }
}

/// Spawn `action` against a session and hand out its observer side
pub(crate) fn run_action<A: DeviceAction>(
    inner: Arc<SessionInner>,
    action: A,
) -> DeviceActionHandle<A> {
    let (state_tx, state_rx) = mpsc::unbounded_channel();
    let (cancel_tx, mut cancel_rx) = watch::channel(false);
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

    let name = action.name();
    let ctx = ActionContext::new(inner);
    let progress = Progress {
        emit: Arc::new(move |value| {
            let _ = progress_tx.send(value);
        }),
    };

    debug!("session {} starts {}", ctx.session_id(), name);

    tokio::spawn(async move {
        let run = action.run(ctx, progress);
        tokio::pin!(run);

        let terminal = loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => {
                    debug!("{name} cancelled");
                    break DeviceActionState::Stopped;
                }
                Some(value) = progress_rx.recv() => {
                    let _ = state_tx.send(DeviceActionState::Pending(value));
                }
                result = &mut run => {
                    // flush intermediates pushed right before the flow
                    // finished, they belong ahead of the terminal state
                    while let Ok(value) = progress_rx.try_recv() {
                        let _ = state_tx.send(DeviceActionState::Pending(value));
                    }
                    break match result {
                        Ok(output) => {
                            debug!("{name} completed");
                            DeviceActionState::Completed(output)
                        }
                        Err(e) => {
                            debug!("{name} failed: {e}");
                            DeviceActionState::Errored(e)
                        }
                    };
                }
            }
        };

        let _ = state_tx.send(terminal);
    });

    DeviceActionHandle {
        states: ActionStates { rx: state_rx },
        canceller: ActionCanceller {
            cancel: Arc::new(cancel_tx),
        },
    }
}

/// Resolves once cancellation is requested, never once every canceller
/// is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow() {
        if cancel.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}
