// Periodic refresh of the arrivals shown for one station
use crate::tb_models::{Route, TBModels, TransitMode};
use crate::tb_source::TransitSource;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What the rendering side reads after every poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrivalsSnapshot {
    pub routes: Vec<Route>,
    pub loading: bool,
    /// User-facing message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub station_code: String,
    pub line_code: Option<String>,
    pub mode: TransitMode,
}

pub struct ArrivalPoller {
    source: Arc<dyn TransitSource>,
    request: PollRequest,
    interval: Duration,
}

impl ArrivalPoller {
    pub fn new(source: Arc<dyn TransitSource>, request: PollRequest, interval: Duration) -> Self {
        ArrivalPoller { source, request, interval }
    }

    /// Start polling on the runtime. The loop lives until the returned handle is
    /// stopped or dropped; see [`PollerHandle`] for what each one guarantees.
    pub fn spawn(self) -> PollerHandle {
        let (tx, snapshot) = watch::channel(ArrivalsSnapshot::default());
        let task = tokio::spawn(self.run(tx));
        PollerHandle { snapshot, task: Some(task) }
    }

    async fn run(self, tx: watch::Sender<ArrivalsSnapshot>) {
        let station = &self.request.station_code;
        info!(
            "Polling arrivals for station {} every {}s",
            station,
            self.interval.as_secs()
        );

        loop {
            tx.send_modify(|s| s.loading = true);

            match self.source.fetch_routes_for_station(station).await {
                Ok(routes) => {
                    let routes = TBModels::routes_for_line(routes, self.request.mode, self.request.line_code.as_deref());
                    debug!("Station {}: {} routes", station, routes.len());
                    tx.send_modify(|s| {
                        s.routes = routes;
                        s.loading = false;
                        s.error = None;
                        s.last_updated = Some(Utc::now());
                    });
                }
                Err(e) => {
                    warn!("Arrivals refresh failed for station {}: {}", station, e);
                    tx.send_modify(|s| {
                        s.loading = false;
                        s.error = Some(e.user_message().to_string());
                    });
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Owner side of a running poll loop.
///
/// Dropping the handle only requests cancellation: a fetch completing on another
/// worker thread may still write one last snapshot after `drop` returns. Call
/// [`PollerHandle::stop`] when no write may follow teardown.
pub struct PollerHandle {
    snapshot: watch::Receiver<ArrivalsSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    #[cfg(test)]
    pub fn snapshot(&self) -> ArrivalsSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ArrivalsSnapshot> {
        self.snapshot.clone()
    }

    /// Stop the loop and wait until it is gone. Once this returns no fetch result
    /// can reach the snapshot any more.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Arrivals poller ended abnormally: {}", e);
                }
            }
        }
    }
}

/// Best effort; does not wait for the task to finish.
impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
