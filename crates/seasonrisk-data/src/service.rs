//! Season data service: on-demand yearly loads plus the today/tomorrow
//! snapshot with polling while tomorrow's risk is pending.
//!
//! State is published through a `tokio::sync::watch` channel. Every change
//! (a loaded year map, the sticky `season_exists` flag, a refreshed
//! today/tomorrow record) is visible to all subscribers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use seasonrisk_core::DataConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::SeasonClient;
use crate::clock::{Clock, LocalClock};
use crate::error::SeasonError;
use crate::gate::DataReadyGate;
use crate::types::{format_date, SeasonDataMap, SeasonRecord};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Snapshot of everything the service publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonState {
    /// Year map from the last successful `load_data`, if any.
    pub season_data_map: Option<Arc<SeasonDataMap>>,
    /// Starts true; flips to false for good after the first failed `load_data`.
    pub season_exists: bool,
    pub today_data: Option<SeasonRecord>,
    pub tomorrow_data: Option<SeasonRecord>,
}

impl Default for SeasonState {
    fn default() -> Self {
        Self {
            season_data_map: None,
            season_exists: true,
            today_data: None,
            tomorrow_data: None,
        }
    }
}

/// What a single `load_data` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A fresh year map was published.
    Loaded,
    /// The readiness gate said no; nothing changed.
    Skipped,
    /// The load failed and `season_exists` is now false.
    Failed,
}

struct RunHandle {
    cancel: CancellationToken,
    polling: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

pub struct SeasonDataService {
    client: SeasonClient,
    gate: Arc<dyn DataReadyGate>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    state: Arc<watch::Sender<SeasonState>>,
    run: Mutex<Option<RunHandle>>,
}

impl SeasonDataService {
    pub fn new(client: SeasonClient, gate: Arc<dyn DataReadyGate>) -> Self {
        let (state, _) = watch::channel(SeasonState::default());
        Self {
            client,
            gate,
            clock: Arc::new(LocalClock),
            poll_interval: DEFAULT_POLL_INTERVAL,
            state: Arc::new(state),
            run: Mutex::new(None),
        }
    }

    /// Build the client and service from the `[data]` config section.
    pub fn from_config(
        config: &DataConfig,
        gate: Arc<dyn DataReadyGate>,
    ) -> Result<Self, SeasonError> {
        let client = SeasonClient::new(&config.base_url, config.request_timeout())?;
        Ok(Self::new(client, gate).with_poll_interval(config.poll_interval()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn snapshot(&self) -> SeasonState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SeasonState> {
        self.state.subscribe()
    }

    /// Fetch and index the yearly file for `date` without touching state.
    pub async fn fetch_year_data(&self, date: &str) -> Result<SeasonDataMap, SeasonError> {
        self.client.fetch_year_data(date).await
    }

    /// Load the year containing `date` once the readiness gate allows it.
    ///
    /// Failures never propagate: they flip `season_exists` to false and leave
    /// the previously published map in place. There is no timeout on the gate.
    pub async fn load_data(&self, date: &str) -> LoadOutcome {
        match self.try_load(date).await {
            Ok(Some(map)) => {
                tracing::info!("Season data for {} loaded ({} days)", date, map.len());
                let map = Arc::new(map);
                self.state.send_modify(|state| state.season_data_map = Some(map));
                LoadOutcome::Loaded
            }
            Ok(None) => {
                tracing::debug!("Data not ready, skipping season load for {}", date);
                LoadOutcome::Skipped
            }
            Err(e) => {
                tracing::warn!("Season data for {} unavailable: {}", date, e);
                self.state.send_if_modified(|state| {
                    let changed = state.season_exists;
                    state.season_exists = false;
                    changed
                });
                LoadOutcome::Failed
            }
        }
    }

    async fn try_load(&self, date: &str) -> Result<Option<SeasonDataMap>, SeasonError> {
        if !self.gate.wait_ready().await? {
            return Ok(None);
        }
        self.client.fetch_year_data(date).await.map(Some)
    }

    /// Load today's and tomorrow's records in the background and keep
    /// polling tomorrow's while its risk is pending.
    ///
    /// Must be called from within a tokio runtime. Calling it again cancels
    /// the previous run first, so at most one poll timer exists.
    pub fn start(&self) {
        let mut run = self.run.lock();
        if let Some(previous) = run.take() {
            tracing::info!("Restarting season service");
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let polling = Arc::new(AtomicBool::new(false));
        let worker = TodayWorker {
            client: self.client.clone(),
            clock: self.clock.clone(),
            state: self.state.clone(),
            polling: polling.clone(),
            poll_interval: self.poll_interval,
        };

        let token = cancel.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("Today/tomorrow refresh cancelled");
                }
                _ = worker.run() => {}
            }
        });

        *run = Some(RunHandle {
            cancel,
            polling,
            task,
        });
    }

    /// Cancel the background refresh, including any active poll timer.
    pub fn stop(&self) {
        if let Some(run) = self.run.lock().take() {
            run.cancel.cancel();
            tracing::info!("Season service stopped");
        }
    }

    /// True while the background task of the current run is alive.
    pub fn is_running(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    /// True while tomorrow's record is being re-fetched on a timer.
    pub fn is_polling(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .is_some_and(|run| run.polling.load(Ordering::SeqCst))
    }
}

impl Drop for SeasonDataService {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut().take() {
            run.cancel.cancel();
        }
    }
}

/// Background half of the service; owns clones of what it needs so the
/// service itself can be dropped while it runs.
struct TodayWorker {
    client: SeasonClient,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<SeasonState>>,
    polling: Arc<AtomicBool>,
    poll_interval: Duration,
}

/// Clears the polling flag however the poll loop ends.
struct PollingGuard(Arc<AtomicBool>);

impl Drop for PollingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TodayWorker {
    async fn run(self) {
        let today = format_date(self.clock.today());
        let tomorrow = format_date(self.clock.tomorrow());

        let maps = tokio::try_join!(
            self.client.fetch_year_data(&today),
            self.client.fetch_year_data(&tomorrow),
        );
        let (today_map, tomorrow_map) = match maps {
            Ok(maps) => maps,
            Err(e) => {
                tracing::error!("Error loading today's or tomorrow's data: {}", e);
                return;
            }
        };

        let today_data = today_map.get(&today).cloned();
        let tomorrow_data = tomorrow_map.get(&tomorrow).cloned();
        let pending = tomorrow_data.as_ref().is_some_and(SeasonRecord::is_pending);

        self.state.send_modify(|state| {
            state.today_data = today_data;
            state.tomorrow_data = tomorrow_data;
        });

        if pending {
            self.poll_tomorrow(&tomorrow).await;
        }
    }

    async fn poll_tomorrow(&self, tomorrow: &str) {
        self.polling.store(true, Ordering::SeqCst);
        let _guard = PollingGuard(self.polling.clone());

        // No upper bound on how long this runs; it ends on resolution or cancel.
        tracing::info!(
            "Risk for {} is pending, polling every {:?}",
            tomorrow,
            self.poll_interval
        );

        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let fresh = match self.client.fetch_year_data(tomorrow).await {
                Ok(map) => map.get(tomorrow).cloned(),
                Err(e) => {
                    tracing::warn!("Error refreshing tomorrow's data: {}", e);
                    continue;
                }
            };

            let resolved = !fresh.as_ref().is_some_and(SeasonRecord::is_pending);
            self.state.send_modify(|state| state.tomorrow_data = fresh);

            if resolved {
                tracing::info!("Risk for {} published, polling stopped", tomorrow);
                break;
            }
        }
    }
}
