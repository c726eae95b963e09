//! Refresh poller — runs a pass on startup and then on every schedule tick.
//!
//! The loop sleeps until the schedule's next fire time, so `@every`
//! intervals and cron expressions share one code path. [`PollerHandle::stop`]
//! ends the loop between passes.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

use super::refresh::Refresher;
use crate::schedule::Schedule;

/// Owner of the background poller task.
pub struct PollerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal the poller and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            error!("Refresh poller ended abnormally: {}", e);
        }
    }
}

/// Start the poller in the background.
pub fn spawn_poller(refresher: Arc<Refresher>, schedule: Schedule) -> PollerHandle {
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(run_poller(refresher, schedule, stop_rx));
    PollerHandle { stop: stop_tx, task }
}

pub async fn run_poller(refresher: Arc<Refresher>, schedule: Schedule, mut stop: watch::Receiver<bool>) {
    // Run immediately on startup
    info!("📡 Refresh poller starting — initial scan...");
    tokio::select! {
        _ = refresher.refresh() => {}
        _ = stop.changed() => {
            info!("Refresh poller stopped");
            return;
        }
    }

    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            warn!(schedule = %schedule, "Schedule never fires again — scheduled refresh disabled");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = time::sleep(wait) => {
                info!("Cron init");
                refresher.refresh().await;
                info!("Cron has been finished");
            }
            _ = stop.changed() => {
                info!("Refresh poller stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ServiceCache;
    use crate::config::Targets;
    use crate::discovery::resolver::DocPaths;
    use crate::discovery::testing::FakeProber;
    use std::time::Duration;

    fn refresher(prober: Arc<FakeProber>) -> Arc<Refresher> {
        Arc::new(Refresher::new(
            Targets::OpenApiUrls(vec!["http://users/v3/api-docs".into()]),
            DocPaths::new(vec!["v3".into()], None, None),
            prober,
            ServiceCache::new(),
        ))
    }

    // Paused clock: sleeps auto-advance once every task is idle, so tick
    // counts are exact.
    #[tokio::test(start_paused = true)]
    async fn test_initial_scan_then_scheduled_passes() {
        let prober = Arc::new(FakeProber::reachable(["http://users/v3/api-docs"]));
        let refresher = refresher(Arc::clone(&prober));

        let handle = spawn_poller(Arc::clone(&refresher), Schedule::Every(Duration::from_secs(60)));
        time::sleep(Duration::from_secs(150)).await;
        handle.stop().await;

        // startup pass plus ticks at 60s and 120s
        assert_eq!(prober.calls().len(), 3, "calls: {:?}", prober.calls());
        assert_eq!(refresher.cache().snapshot().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_scheduled_passes() {
        let prober = Arc::new(FakeProber::reachable(["http://users/v3/api-docs"]));
        let refresher = refresher(Arc::clone(&prober));

        let handle = spawn_poller(refresher, Schedule::Every(Duration::from_secs(10)));
        time::sleep(Duration::from_secs(25)).await;
        handle.stop().await;
        assert_eq!(prober.calls().len(), 3);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(prober.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_interval_runs_only_initial_scan() {
        let prober = Arc::new(FakeProber::reachable(["http://users/v3/api-docs"]));
        let refresher = refresher(Arc::clone(&prober));

        let handle = spawn_poller(refresher, Schedule::Every(Duration::from_secs(3600)));
        time::sleep(Duration::from_secs(3599)).await;
        handle.stop().await;

        assert_eq!(prober.calls().len(), 1);
    }
}
