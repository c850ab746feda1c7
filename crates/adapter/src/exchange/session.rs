//! Page-wide exchange session.
//!
//! One session exists per page. It loads the exchange's client library at
//! most once, owns the command queue the SDK drains, and hands out the
//! render-target ids slots are defined with. Adapter instances on the same
//! page share a session through `Arc`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use error_stack::{Report, ResultExt};
use url::Url;

use crate::error::FastlaneError;
use crate::settings::FastlaneSettings;

use super::queue::CommandQueue;
use super::{Command, ExchangeSdk, ScriptLoader};

/// Lifecycle of the SDK within the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// Script requested, waiting for the exchange to signal ready.
    Loading,
    Ready,
    /// Initialisation hit a configuration error; never retried.
    Failed,
}

struct SessionInner {
    state: SessionState,
    account_id: Option<String>,
    failure: Option<String>,
}

#[derive(Default)]
struct LedgerState {
    reported: HashSet<String>,
    timed_out: HashSet<String>,
}

/// Which render targets already have an outcome.
///
/// Shared by every round on the page so a target is settled exactly once,
/// whether by an auction fan-out, a rejected definition or a timeout.
#[derive(Default)]
pub struct OutcomeLedger {
    state: Mutex<LedgerState>,
}

impl OutcomeLedger {
    /// Claim `target_id` for a reported outcome. False if it is already settled.
    pub fn claim_report(&self, target_id: &str) -> bool {
        let mut state = self.lock();
        if state.timed_out.contains(target_id) {
            return false;
        }
        state.reported.insert(target_id.to_string())
    }

    /// Claim `target_id` for a timeout failure. False if it is already settled.
    pub fn claim_timeout(&self, target_id: &str) -> bool {
        let mut state = self.lock();
        if state.reported.contains(target_id) {
            return false;
        }
        state.timed_out.insert(target_id.to_string())
    }

    #[must_use]
    pub fn is_settled(&self, target_id: &str) -> bool {
        let state = self.lock();
        state.reported.contains(target_id) || state.timed_out.contains(target_id)
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The exchange connection shared by every adapter on the page.
pub struct ExchangeSession {
    config: FastlaneSettings,
    loader: Arc<dyn ScriptLoader>,
    queue: CommandQueue,
    inner: Mutex<SessionInner>,
    slot_counter: AtomicU64,
    outcomes: Arc<OutcomeLedger>,
}

impl ExchangeSession {
    /// Create a session whose SDK has not been loaded yet.
    #[must_use]
    pub fn new(config: FastlaneSettings, loader: Arc<dyn ScriptLoader>) -> Arc<Self> {
        Arc::new(Self {
            config,
            loader,
            queue: CommandQueue::new(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Uninitialized,
                account_id: None,
                failure: None,
            }),
            slot_counter: AtomicU64::new(0),
            outcomes: Arc::new(OutcomeLedger::default()),
        })
    }

    /// Create a session around an SDK that is already loaded on the page.
    ///
    /// No script load is ever triggered for such a session.
    #[must_use]
    pub fn with_sdk(
        config: FastlaneSettings,
        loader: Arc<dyn ScriptLoader>,
        sdk: Arc<dyn ExchangeSdk>,
    ) -> Arc<Self> {
        let session = Self::new(config, loader);
        session.mark_ready(sdk);
        session
    }

    #[must_use]
    pub fn config(&self) -> &FastlaneSettings {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Account the SDK was (or is being) loaded for.
    #[must_use]
    pub fn account_id(&self) -> Option<String> {
        self.lock().account_id.clone()
    }

    #[must_use]
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    #[must_use]
    pub fn outcomes(&self) -> &Arc<OutcomeLedger> {
        &self.outcomes
    }

    /// Request the SDK for `account_id` unless a load already happened.
    ///
    /// Only the first successful call has any effect; later calls, whatever
    /// account they carry, reuse the pending or loaded SDK.
    ///
    /// # Errors
    ///
    /// Returns [`FastlaneError::Configuration`] when the account id or script
    /// URL is missing or invalid, when the loader refuses the script, or when
    /// an earlier initialisation already failed. The session then stays
    /// [`SessionState::Failed`].
    pub fn ensure_loaded(
        self: &Arc<Self>,
        account_id: Option<&str>,
    ) -> Result<(), Report<FastlaneError>> {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Loading | SessionState::Ready => {
                if let (Some(requested), Some(loaded)) = (account_id, inner.account_id.as_deref())
                {
                    if requested != loaded {
                        log::warn!(
                            "Exchange SDK already initialised for account '{}', ignoring account '{}'",
                            loaded,
                            requested
                        );
                    }
                }
                return Ok(());
            }
            SessionState::Failed => {
                return Err(Report::new(FastlaneError::configuration(format!(
                    "exchange session failed to initialise earlier: {}",
                    inner.failure.as_deref().unwrap_or("unknown reason")
                ))));
            }
            SessionState::Uninitialized => {}
        }

        let url = match self.script_url(account_id) {
            Ok(url) => url,
            Err(err) => {
                log::error!("Failed to initialise exchange SDK: {:?}", err);
                inner.state = SessionState::Failed;
                inner.failure = Some(err.current_context().to_string());
                return Err(err);
            }
        };

        inner.state = SessionState::Loading;
        inner.account_id = account_id.map(str::to_string);
        drop(inner);

        log::info!("Loading exchange SDK from {}", url);
        let signal = ReadySignal {
            session: Arc::clone(self),
        };
        if let Err(err) = self.loader.load_script(&url, signal) {
            log::error!("Failed to load exchange SDK from {}: {:?}", url, err);
            let mut inner = self.lock();
            inner.state = SessionState::Failed;
            inner.failure = Some(err.current_context().to_string());
            return Err(err.change_context(FastlaneError::configuration(format!(
                "could not load exchange SDK from {url}"
            ))));
        }

        Ok(())
    }

    /// Queue `command` for the SDK.
    pub fn enqueue(&self, command: Command) {
        self.queue.push(command);
    }

    /// Allocate the next render-target id.
    ///
    /// Ids are `prefix + n` with `n` counting up from 1 and never reused for
    /// the lifetime of the session.
    #[must_use]
    pub fn next_target_id(&self) -> String {
        let n = self.slot_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{}", self.config.slot_id_prefix, n)
    }

    /// Build `<script_base_url>/<account_id>.js`.
    fn script_url(&self, account_id: Option<&str>) -> Result<Url, Report<FastlaneError>> {
        let account_id = account_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Report::new(FastlaneError::configuration(
                    "missing accountId in fastlane params",
                ))
            })?;

        if !account_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Report::new(FastlaneError::configuration(format!(
                "invalid accountId '{account_id}'"
            ))));
        }

        let base = self.config.script_base_url.trim();
        if base.is_empty() {
            return Err(Report::new(FastlaneError::configuration(
                "attempted to request an empty script URL",
            )));
        }

        let mut base = Url::parse(base).change_context(FastlaneError::configuration(format!(
            "invalid script_base_url '{base}'"
        )))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(&format!("{account_id}.js"))
            .change_context(FastlaneError::configuration(format!(
                "could not build script URL for account '{account_id}'"
            )))
    }

    fn mark_ready(&self, sdk: Arc<dyn ExchangeSdk>) {
        {
            let mut inner = self.lock();
            if inner.state == SessionState::Ready {
                log::warn!("Exchange SDK signalled ready twice, ignoring");
                return;
            }
            inner.state = SessionState::Ready;
        }
        log::info!("Exchange SDK ready");
        self.queue.signal_ready(sdk);
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handed to the [`ScriptLoader`]; fired once the exchange SDK is usable.
pub struct ReadySignal {
    session: Arc<ExchangeSession>,
}

impl ReadySignal {
    /// Mark the session ready and replay queued commands against `sdk`.
    pub fn ready(self, sdk: Arc<dyn ExchangeSdk>) {
        self.session.mark_ready(sdk);
    }
}
