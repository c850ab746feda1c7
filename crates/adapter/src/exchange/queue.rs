//! FIFO command queue gated on SDK readiness.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Command, ExchangeSdk};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Command>,
    sdk: Option<Arc<dyn ExchangeSdk>>,
    draining: bool,
}

/// Commands waiting for (or being run against) the exchange SDK.
///
/// Before [`CommandQueue::signal_ready`] every pushed command is held. Once
/// ready, commands run in push order; a command pushed while the queue is
/// draining, including from inside another command, joins the tail. No lock
/// is held while a command runs.
#[derive(Default)]
pub struct CommandQueue {
    state: Mutex<QueueState>,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `command`, running it right away if the SDK is ready and
    /// nothing is ahead of it.
    pub fn push(&self, command: Command) {
        let mut state = self.lock();
        state.pending.push_back(command);

        let Some(sdk) = state.sdk.clone() else {
            return;
        };
        if state.draining {
            return;
        }
        state.draining = true;
        drop(state);

        self.drain(sdk.as_ref());
    }

    /// Mark the SDK as ready and replay everything queued so far.
    ///
    /// Only the first signal counts.
    pub fn signal_ready(&self, sdk: Arc<dyn ExchangeSdk>) {
        let mut state = self.lock();
        if state.sdk.is_some() {
            log::warn!("Exchange SDK signalled ready more than once, ignoring");
            return;
        }
        state.sdk = Some(Arc::clone(&sdk));
        if state.draining {
            return;
        }
        state.draining = true;
        let pending = state.pending.len();
        drop(state);

        log::debug!("Exchange SDK ready, replaying {} queued commands", pending);
        self.drain(sdk.as_ref());
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock().sdk.is_some()
    }

    /// Number of commands not yet run.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    fn drain(&self, sdk: &dyn ExchangeSdk) {
        loop {
            let next = {
                let mut state = self.lock();
                match state.pending.pop_front() {
                    Some(command) => command,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            next(sdk);
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
