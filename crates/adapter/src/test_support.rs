#[cfg(test)]
pub mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex, MutexGuard, Once};

    use error_stack::Report;
    use url::Url;

    use crate::error::FastlaneError;
    use crate::exchange::{
        AuctionCallback, ExchangeSdk, ExchangeSlot, ReadySignal, ScriptLoader,
    };
    use crate::registry::BidRegistry;
    use crate::settings::FastlaneSettings;
    use crate::types::{AdCandidate, AdSize, BidOutcome, FastlaneParams, PlacementRequest};

    pub fn crate_test_settings_str() -> String {
        r#"
            [fastlane]
            script_base_url = "https://ads.rubiconproject.com/header/"
            slot_id_prefix = "pb_flane_slot-"
            auction_timeout_ms = 500

            [logging]
            level = "debug"
            "#
        .to_string()
    }

    static CAPTURED_LOGS: Mutex<Vec<(log::Level, String)>> = Mutex::new(Vec::new());
    static INSTALL_CAPTURE: Once = Once::new();

    struct CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            CAPTURED_LOGS
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;

    /// Route every log record of the test binary into memory.
    ///
    /// Tests run in parallel, so look records up by something unique to the
    /// test, such as a target id.
    pub fn capture_logs() {
        INSTALL_CAPTURE.call_once(|| {
            log::set_logger(&CAPTURE_LOGGER).expect("no other logger installed in tests");
            log::set_max_level(log::LevelFilter::Trace);
        });
    }

    /// Captured records at `level` whose message contains `needle`.
    pub fn logged(level: log::Level, needle: &str) -> Vec<String> {
        CAPTURED_LOGS
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(at, message)| *at == level && message.contains(needle))
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn test_fastlane_settings() -> FastlaneSettings {
        FastlaneSettings::default()
    }

    /// A 300x250 placement for `account_id`.
    pub fn placement(placement_code: &str, account_id: &str) -> PlacementRequest {
        PlacementRequest {
            placement_code: placement_code.to_string(),
            sizes: vec![AdSize::new(300, 250)],
            params: FastlaneParams {
                account_id: Some(account_id.to_string()),
            },
        }
    }

    struct FakeSlot {
        element_id: String,
        slot_name: String,
        responses: Option<Vec<AdCandidate>>,
    }

    impl ExchangeSlot for FakeSlot {
        fn element_id(&self) -> String {
            self.element_id.clone()
        }

        fn slot_name(&self) -> String {
            self.slot_name.clone()
        }

        fn raw_responses(&self) -> Option<Vec<AdCandidate>> {
            self.responses.clone()
        }
    }

    #[derive(Default)]
    struct ExchangeState {
        /// `(element_id, slot_name)` in definition order.
        defined: Vec<(String, String)>,
        responses: HashMap<String, Vec<AdCandidate>>,
        rejected: HashSet<String>,
        pending_runs: Vec<AuctionCallback>,
        run_count: usize,
    }

    /// In-memory exchange SDK.
    ///
    /// Candidates are keyed by slot name. A deferred exchange holds auction
    /// callbacks until [`FakeExchange::complete_runs`].
    pub struct FakeExchange {
        deferred: bool,
        state: Mutex<ExchangeState>,
    }

    impl FakeExchange {
        /// An exchange that completes every auction as soon as it runs.
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                deferred: false,
                state: Mutex::new(ExchangeState::default()),
            })
        }

        pub fn deferred() -> Arc<Self> {
            Arc::new(Self {
                deferred: true,
                state: Mutex::new(ExchangeState::default()),
            })
        }

        pub fn respond(&self, slot_name: &str, candidates: Vec<AdCandidate>) {
            self.lock()
                .responses
                .insert(slot_name.to_string(), candidates);
        }

        pub fn reject_slot(&self, slot_name: &str) {
            self.lock().rejected.insert(slot_name.to_string());
        }

        /// Fire every auction callback held so far.
        pub fn complete_runs(&self) {
            let pending = std::mem::take(&mut self.lock().pending_runs);
            for on_complete in pending {
                on_complete(self as &dyn ExchangeSdk);
            }
        }

        /// Fire only the oldest held auction callback.
        pub fn complete_next(&self) {
            let next = {
                let mut state = self.lock();
                if state.pending_runs.is_empty() {
                    None
                } else {
                    Some(state.pending_runs.remove(0))
                }
            };
            if let Some(on_complete) = next {
                on_complete(self as &dyn ExchangeSdk);
            }
        }

        pub fn defined_slots(&self) -> Vec<(String, String)> {
            self.lock().defined.clone()
        }

        pub fn run_count(&self) -> usize {
            self.lock().run_count
        }

        fn lock(&self) -> MutexGuard<'_, ExchangeState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl ExchangeSdk for FakeExchange {
        fn define_slot(
            &self,
            slot_name: &str,
            _sizes: &[AdSize],
            element_id: &str,
        ) -> Result<(), Report<FastlaneError>> {
            let mut state = self.lock();
            if state.rejected.contains(slot_name) {
                return Err(Report::new(FastlaneError::exchange(format!(
                    "slot '{slot_name}' rejected"
                ))));
            }
            state
                .defined
                .push((element_id.to_string(), slot_name.to_string()));
            Ok(())
        }

        fn run(&self, on_complete: AuctionCallback) {
            {
                let mut state = self.lock();
                state.run_count += 1;
                if self.deferred {
                    state.pending_runs.push(on_complete);
                    return;
                }
            }
            on_complete(self as &dyn ExchangeSdk);
        }

        fn all_slots(&self) -> Vec<Arc<dyn ExchangeSlot>> {
            let state = self.lock();
            state
                .defined
                .iter()
                .map(|(element_id, slot_name)| {
                    Arc::new(FakeSlot {
                        element_id: element_id.clone(),
                        slot_name: slot_name.clone(),
                        responses: state.responses.get(slot_name).cloned(),
                    }) as Arc<dyn ExchangeSlot>
                })
                .collect()
        }
    }

    enum LoadMode {
        Immediate(Arc<dyn ExchangeSdk>),
        Deferred,
        Failing,
    }

    #[derive(Default)]
    struct LoaderState {
        urls: Vec<String>,
        signal: Option<ReadySignal>,
    }

    /// Records script loads instead of fetching anything.
    pub struct FakeLoader {
        mode: LoadMode,
        state: Mutex<LoaderState>,
    }

    impl FakeLoader {
        /// Signals ready with `sdk` inside `load_script`.
        pub fn immediate(sdk: Arc<dyn ExchangeSdk>) -> Arc<Self> {
            Self::with_mode(LoadMode::Immediate(sdk))
        }

        /// Holds the ready signal until [`FakeLoader::finish`].
        pub fn deferred() -> Arc<Self> {
            Self::with_mode(LoadMode::Deferred)
        }

        pub fn failing() -> Arc<Self> {
            Self::with_mode(LoadMode::Failing)
        }

        fn with_mode(mode: LoadMode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                state: Mutex::new(LoaderState::default()),
            })
        }

        pub fn load_count(&self) -> usize {
            self.lock().urls.len()
        }

        pub fn loaded_urls(&self) -> Vec<String> {
            self.lock().urls.clone()
        }

        /// Deliver the held ready signal.
        pub fn finish(&self, sdk: Arc<dyn ExchangeSdk>) {
            let signal = self
                .lock()
                .signal
                .take()
                .expect("no script load is waiting");
            signal.ready(sdk);
        }

        fn lock(&self) -> MutexGuard<'_, LoaderState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl ScriptLoader for FakeLoader {
        fn load_script(
            &self,
            url: &Url,
            on_ready: ReadySignal,
        ) -> Result<(), Report<FastlaneError>> {
            self.lock().urls.push(url.to_string());
            match &self.mode {
                LoadMode::Immediate(sdk) => {
                    on_ready.ready(Arc::clone(sdk));
                    Ok(())
                }
                LoadMode::Deferred => {
                    self.lock().signal = Some(on_ready);
                    Ok(())
                }
                LoadMode::Failing => Err(Report::new(FastlaneError::configuration(format!(
                    "script blocked: {url}"
                )))),
            }
        }
    }

    /// Registry that keeps every outcome it is given.
    #[derive(Default)]
    pub struct RecordingRegistry {
        responses: Mutex<Vec<(String, BidOutcome)>>,
    }

    impl RecordingRegistry {
        pub fn responses(&self) -> Vec<(String, BidOutcome)> {
            self.lock().clone()
        }

        pub fn len(&self) -> usize {
            self.lock().len()
        }

        pub fn is_empty(&self) -> bool {
            self.lock().is_empty()
        }

        pub fn count_for(&self, placement_code: &str) -> usize {
            self.lock()
                .iter()
                .filter(|(code, _)| code == placement_code)
                .count()
        }

        /// First outcome reported for `placement_code`.
        pub fn outcome_for(&self, placement_code: &str) -> Option<BidOutcome> {
            self.lock()
                .iter()
                .find(|(code, _)| code == placement_code)
                .map(|(_, outcome)| outcome.clone())
        }

        fn lock(&self) -> MutexGuard<'_, Vec<(String, BidOutcome)>> {
            self.responses.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl BidRegistry for RecordingRegistry {
        fn add_bid_response(&self, placement_code: &str, bid: BidOutcome) {
            self.lock().push((placement_code.to_string(), bid));
        }
    }
}
