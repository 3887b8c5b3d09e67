/// Background refresher: keeps entries from expiring under normal load
///
/// A single loop ticks every `tick_interval_ms` and refreshes every entry that
/// has used up `early_refresh_ratio` of its interval. Refreshes run in the
/// loop's own `JoinSet` so shutdown can drain or abort them.
use super::store::CacheStore;
use crate::config::RefresherConfig;
use crate::logger::{self, LogTag};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

struct RunningLoop {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

pub struct BackgroundRefresher {
    store: Arc<CacheStore>,
    config: RefresherConfig,
    running: Mutex<Option<RunningLoop>>,
}

impl BackgroundRefresher {
    pub fn new(store: Arc<CacheStore>, config: RefresherConfig) -> Self {
        Self {
            store,
            config,
            running: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .map(|running| !running.handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the refresh loop; returns `false` if it is already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            logger::debug(LogTag::Refresher, "Refresher already running");
            return false;
        }

        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.store),
            self.config.clone(),
            Arc::clone(&shutdown),
        ));
        *running = Some(RunningLoop { shutdown, handle });

        logger::info(
            LogTag::Refresher,
            &format!(
                "Refresher started (tick {}ms, early ratio {})",
                self.config.tick_interval_ms, self.config.early_refresh_ratio
            ),
        );
        true
    }

    /// Signal the loop and wait for it; returns `false` if it was not running
    pub async fn stop(&self) -> bool {
        let Some(RunningLoop { shutdown, mut handle }) = self.running.lock().take() else {
            return false;
        };

        shutdown.notify_one();
        // The loop enforces the grace period itself; this is the backstop
        let backstop = self.config.shutdown_timeout() * 2;
        match tokio::time::timeout(backstop, &mut handle).await {
            Ok(Ok(())) => {
                logger::info(LogTag::Refresher, "Refresher stopped");
            }
            Ok(Err(e)) => {
                logger::error(LogTag::Refresher, &format!("Refresher loop ended abnormally: {}", e));
            }
            Err(_) => {
                logger::warning(LogTag::Refresher, "Refresher loop unresponsive, aborting it");
                handle.abort();
                let _ = handle.await;
            }
        }
        true
    }

    /// Run a single scan, spawning due refreshes into `tasks`
    pub fn schedule_due(&self, tasks: &mut JoinSet<bool>) -> usize {
        schedule_due(&self.store, self.config.early_refresh_ratio, tasks)
    }
}

impl std::fmt::Debug for BackgroundRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRefresher")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

fn schedule_due(store: &CacheStore, early_ratio: f64, tasks: &mut JoinSet<bool>) -> usize {
    let mut scheduled = 0;

    for entry in store.snapshot() {
        if !entry.has_value() || entry.is_updating() {
            continue;
        }

        let threshold = entry.refresh_interval().mul_f64(early_ratio);
        if entry.time_since_update() < threshold {
            continue;
        }

        let Some(callback) = store.registry().get(entry.key()) else {
            continue;
        };

        // Contention means a foreground caller is already refreshing it
        let Some(guard) = entry.try_begin_refresh() else {
            continue;
        };

        logger::debug(
            LogTag::Refresher,
            &format!("Refreshing {} ahead of expiry", entry.key()),
        );
        tasks.spawn(store.refresh_task(guard, callback));
        scheduled += 1;
    }

    scheduled
}

async fn run_loop(store: Arc<CacheStore>, config: RefresherConfig, shutdown: Arc<Notify>) {
    let mut ticker = tokio::time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tasks: JoinSet<bool> = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            _ = ticker.tick() => {
                let scheduled = schedule_due(&store, config.early_refresh_ratio, &mut tasks);
                if scheduled > 0 {
                    logger::verbose(
                        LogTag::Refresher,
                        &format!("Tick scheduled {} refreshes ({} in flight)", scheduled, tasks.len()),
                    );
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    logger::error(LogTag::Refresher, &format!("Refresh task aborted: {}", e));
                }
            }
        }
    }

    if tasks.is_empty() {
        return;
    }

    logger::debug(
        LogTag::Refresher,
        &format!("Draining {} in-flight refreshes", tasks.len()),
    );
    let drain = async { while tasks.join_next().await.is_some() {} };
    if tokio::time::timeout(config.shutdown_timeout(), drain).await.is_err() {
        logger::warning(
            LogTag::Refresher,
            &format!(
                "Cancelling {} refreshes still running after {}ms",
                tasks.len(),
                config.shutdown_timeout_ms
            ),
        );
        // Cancelled tasks drop their guards, releasing the entries
        tasks.shutdown().await;
    }
}
