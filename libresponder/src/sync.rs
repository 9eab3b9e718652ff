//! Periodic reconciliation of the responder's own marker with the device location
//!
//! Every tick does two independent things:
//!
//! * fetch the markers visible to the responder and replace the in-memory list with them
//! * make sure the backend has exactly one marker titled with the responder's username, at the
//!   current coordinates. The backend has no upsert, so this checks whether the marker exists
//!   and then either updates it or, when the check answers "not found", creates it.
//!
//! Failures of either part are logged and otherwise ignored; the next tick simply tries again.
use crate::{
    backend::{DEFAULT_MARKER_DESCRIPTION, MarkerApi, NewMarker},
    identity::{Identity, IdentityStore},
    location::{LocationFix, LocationProvider},
    marker::{Marker, MarkerCollection},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace, warn};

/// How often the loop reconciles the responder's marker
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Result of fetching the visible markers
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Markers(Vec<Marker>),
    /// The backend answered with something other than a list
    NotAList,
    Failed,
}

/// Result of reconciling the responder's own marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Updated,
    Created,
    /// The backend knows the title but says the marker doesn't exist
    Untouched,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    /// Identity or location was not available yet
    Skipped,
    Completed {
        fetch: FetchOutcome,
        reconcile: ReconcileOutcome,
    },
}

/// A single reconciliation step against the backend. Identity and location are passed in by the
/// caller so that a tick never reads ambient state.
#[derive(Clone)]
pub struct MarkerSync {
    api: Arc<dyn MarkerApi>,
    markers: MarkerCollection,
}

impl MarkerSync {
    pub fn new(api: Arc<dyn MarkerApi>, markers: MarkerCollection) -> Self {
        Self { api, markers }
    }

    pub fn markers(&self) -> &MarkerCollection {
        &self.markers
    }

    /// Run one tick without touching the marker collection. Use [MarkerSync::apply] to store the
    /// fetched markers.
    pub async fn tick(&self, identity: Option<&Identity>, fix: Option<&LocationFix>) -> TickReport {
        let (Some(identity), Some(fix)) = (identity, fix) else {
            trace!("identity or location unknown, skipping tick");
            return TickReport::Skipped;
        };
        let (fetch, reconcile) =
            tokio::join!(self.fetch(&identity.username), self.reconcile(identity, fix));
        debug!(?reconcile, "tick complete");
        TickReport::Completed { fetch, reconcile }
    }

    /// Store the markers fetched during a tick. Returns whether the collection was replaced.
    pub fn apply(&self, report: &TickReport) -> bool {
        match report {
            TickReport::Completed {
                fetch: FetchOutcome::Markers(markers),
                ..
            } => {
                self.markers.replace(markers.clone());
                true
            }
            _ => false,
        }
    }

    /// Run one tick and store its result
    pub async fn run_once(
        &self,
        identity: Option<&Identity>,
        fix: Option<&LocationFix>,
    ) -> TickReport {
        let report = self.tick(identity, fix).await;
        self.apply(&report);
        report
    }

    async fn fetch(&self, username: &str) -> FetchOutcome {
        match self.api.list_markers(username).await {
            Ok(Some(markers)) => {
                trace!(count = markers.len(), "fetched markers");
                FetchOutcome::Markers(markers)
            }
            Ok(None) => FetchOutcome::NotAList,
            Err(e) => {
                warn!(error = %e, "Failed to fetch markers");
                FetchOutcome::Failed
            }
        }
    }

    async fn reconcile(&self, identity: &Identity, fix: &LocationFix) -> ReconcileOutcome {
        let username = identity.username.as_str();
        match self.api.marker_exists(username).await {
            Ok(true) => match self
                .api
                .update_marker(username, fix.latitude, fix.longitude)
                .await
            {
                Ok(()) => ReconcileOutcome::Updated,
                Err(e) => {
                    warn!(error = %e, username, "Failed to update marker");
                    ReconcileOutcome::Failed
                }
            },
            Ok(false) => ReconcileOutcome::Untouched,
            Err(e) if e.is_not_found() => {
                let marker = NewMarker {
                    latitude: fix.latitude,
                    longitude: fix.longitude,
                    description: DEFAULT_MARKER_DESCRIPTION.to_string(),
                    user_id: identity.user_id.clone(),
                    title: username.to_string(),
                };
                match self.api.create_marker(username, &marker).await {
                    Ok(()) => {
                        info!(username, "Created marker");
                        ReconcileOutcome::Created
                    }
                    Err(e) => {
                        warn!(error = %e, username, "Failed to create marker");
                        ReconcileOutcome::Failed
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, username, "Failed to check for marker");
                ReconcileOutcome::Failed
            }
        }
    }
}

/// Drives a [MarkerSync] on a fixed interval, reading the identity and location afresh every
/// tick. Ticks never overlap: an interval that elapses while a tick is still running is skipped.
pub struct SyncLoop {
    sync: MarkerSync,
    identity: Arc<dyn IdentityStore>,
    location: Arc<dyn LocationProvider>,
    interval: Duration,
}

impl SyncLoop {
    pub fn new(
        sync: MarkerSync,
        identity: Arc<dyn IdentityStore>,
        location: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            sync,
            identity,
            location,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn current_identity(&self) -> Option<Identity> {
        match Identity::load(self.identity.as_ref()).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Failed to read identity");
                None
            }
        }
    }

    /// Start ticking. The first tick happens one interval from now.
    pub fn spawn(self) -> SyncHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(interval = ?self.interval, "marker sync started");
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.wait_for(|stop| *stop) => break,
                    _ = interval.tick() => {}
                }
                let identity = self.current_identity().await;
                let fix = self.location.current_fix();
                let report = self.sync.tick(identity.as_ref(), fix.as_ref()).await;
                if *stopped.borrow() {
                    debug!("marker sync stopped during a tick, discarding result");
                    break;
                }
                self.sync.apply(&report);
            }
            debug!("marker sync stopped");
        });
        SyncHandle {
            shutdown,
            task: Some(task),
        }
    }
}

/// Handle to a running [SyncLoop]. Dropping the handle stops the loop.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Stop issuing ticks. A tick that is already running finishes, but its result is dropped.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Stop the loop and wait for the in-flight tick, if any, to finish
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "marker sync task failed");
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
