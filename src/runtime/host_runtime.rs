//! The poll loop of one Host.

use crate::config::HostSettings;
use crate::core::{
    application::{
        reconciler::reconcile, registry_bridge::RegistryBridge, snapshot_fetcher::SnapshotFetcher,
    },
    domain::{
        model::{host_options::HostOptions, snapshot::ClusterSnapshot},
        value_object::{HostId, serde_helpers},
    },
    infrastructure::api_client::ClusterApi,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of one tick attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A snapshot was committed and `events` changes were applied.
    Committed { events: usize },
    /// The fetch failed; nothing changed.
    Failed { error: String },
    /// Another tick was still running.
    Skipped,
    /// Polling is suspended after an authentication failure.
    Suspended,
}

/// Last completed poll, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct LastPoll {
    pub success: bool,
    pub error: Option<String>,
    #[serde(with = "serde_helpers::system_time")]
    pub at: SystemTime,
}

struct TickState {
    /// Orphans are pruned once, before the first commit of this runtime.
    pruned: bool,
    suspended: bool,
}

pub(crate) struct HostRuntime {
    settings: HostSettings,
    api: Arc<dyn ClusterApi>,
    fetcher: SnapshotFetcher,
    bridge: RegistryBridge,
    options: watch::Sender<HostOptions>,
    committed: watch::Sender<Option<Arc<ClusterSnapshot>>>,
    last_poll: watch::Sender<Option<LastPoll>>,
    tick_state: Mutex<TickState>,
    refresh: Notify,
    cancel: CancellationToken,
}

impl HostRuntime {
    /// `committed` seeds the previous snapshot, so a reconfigured Host diffs
    /// against what is already registered instead of recreating it.
    pub(crate) fn new(
        settings: HostSettings,
        api: Arc<dyn ClusterApi>,
        bridge: RegistryBridge,
        committed: Option<Arc<ClusterSnapshot>>,
    ) -> Self {
        let (options, _) = watch::channel(settings.options.clone());
        let (committed_tx, _) = watch::channel(committed.clone());
        let (last_poll, _) = watch::channel(None);
        Self {
            fetcher: SnapshotFetcher::new(api.clone()),
            settings,
            api,
            bridge,
            options,
            committed: committed_tx,
            last_poll,
            tick_state: Mutex::new(TickState {
                pruned: committed.is_some(),
                suspended: false,
            }),
            refresh: Notify::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn host_id(&self) -> &HostId {
        &self.settings.id
    }

    pub(crate) fn settings(&self) -> &HostSettings {
        &self.settings
    }

    pub(crate) fn api(&self) -> &Arc<dyn ClusterApi> {
        &self.api
    }

    pub(crate) fn bridge(&self) -> &RegistryBridge {
        &self.bridge
    }

    pub(crate) fn options(&self) -> HostOptions {
        self.options.borrow().clone()
    }

    /// Replaces the options; the next tick reads them.
    pub(crate) fn set_options(&self, options: HostOptions) {
        self.options.send_replace(options);
    }

    pub(crate) fn snapshot(&self) -> Option<Arc<ClusterSnapshot>> {
        self.committed.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<Arc<ClusterSnapshot>>> {
        self.committed.subscribe()
    }

    pub(crate) fn last_poll(&self) -> Option<LastPoll> {
        self.last_poll.borrow().clone()
    }

    /// Asks the loop for a tick as soon as possible.
    pub(crate) fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until no tick is in flight.
    pub(crate) async fn quiesce(&self) {
        drop(self.tick_state.lock().await);
    }

    /// Runs one tick unless another is in progress.
    ///
    /// The committed snapshot and the registry change only when the fetch
    /// succeeds; a failed tick leaves both as they were.
    pub(crate) async fn tick(&self) -> TickOutcome {
        let Ok(mut state) = self.tick_state.try_lock() else {
            debug!(host = %self.host_id(), "previous tick still running, skipping");
            return TickOutcome::Skipped;
        };
        if state.suspended {
            return TickOutcome::Suspended;
        }

        let policy = self.options.borrow().ip_policy();
        let previous = self.snapshot();

        match self.fetcher.fetch(previous.as_deref(), &policy).await {
            Ok(next) => {
                if self.cancel.is_cancelled() {
                    return TickOutcome::Skipped;
                }
                if !state.pruned {
                    self.bridge.prune(&next);
                    state.pruned = true;
                }
                let plan = reconcile(previous.as_deref(), &next);
                self.bridge.apply(&plan);
                debug!(
                    host = %self.host_id(),
                    nodes = next.nodes.len(),
                    guests = next.guests.len(),
                    events = plan.len(),
                    "tick committed"
                );
                self.committed.send_replace(Some(Arc::new(next)));
                self.record(None);
                TickOutcome::Committed { events: plan.len() }
            }
            Err(e) => {
                if e.is_fatal_for_polling() {
                    error!(host = %self.host_id(), error = %e, "authentication failed, polling suspended until reconfigured");
                    state.suspended = true;
                } else {
                    warn!(host = %self.host_id(), error = %e, "poll failed, keeping previous state");
                }
                let error = e.to_string();
                self.record(Some(error.clone()));
                TickOutcome::Failed { error }
            }
        }
    }

    fn record(&self, error: Option<String>) {
        self.last_poll.send_replace(Some(LastPoll {
            success: error.is_none(),
            error,
            at: SystemTime::now(),
        }));
    }

    /// Ticks immediately, then every scan interval, until cancelled.
    pub(crate) async fn run(self: Arc<Self>) {
        let mut options = self.options.subscribe();
        let mut period = options.borrow_and_update().scan_interval();
        let mut interval = ticker(Instant::now(), period);
        info!(host = %self.host_id(), interval = ?period, "poll loop started");

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                changed = options.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = options.borrow_and_update().scan_interval();
                    if next != period {
                        info!(host = %self.host_id(), from = ?period, to = ?next, "scan interval changed");
                        period = next;
                        interval = ticker(Instant::now() + period, period);
                    }
                }
                () = self.refresh.notified() => self.tick_cancellable().await,
                _ = interval.tick() => self.tick_cancellable().await,
            }
        }

        info!(host = %self.host_id(), "poll loop stopped");
    }

    async fn tick_cancellable(&self) {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {}
            _ = self.tick() => {}
        }
    }
}

fn ticker(start: Instant, period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
