//! Running the marker sync loop from the command line
use crate::{
    config::Config,
    output::{OutputFormat, rows::MarkerRow},
};
use anyhow::Result;
use libresponder::{
    backend::HttpBackend,
    identity::{FileIdentityStore, Identity},
    location::{LocationFeed, LocationFix, read_fixes, track_own_location},
    marker::MarkerCollection,
    sync::{MarkerSync, SyncLoop},
};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};

/// Where `responderctl sync` gets the device location from
pub(crate) enum LocationSource {
    Fixed(LocationFix),
    Stdin,
}

/// Handle the `responderctl sync` command. Runs until interrupted with Ctrl-C.
pub(crate) async fn run(cfg: &Config, store: FileIdentityStore, source: LocationSource) -> Result<()> {
    if Identity::load(&store).await?.is_none() {
        warn!("No responder identity stored yet, ticks are skipped until 'responderctl login'");
    }
    let backend = Arc::new(HttpBackend::new(&cfg.server, cfg.timeout())?);
    let markers = MarkerCollection::new();
    let feed = LocationFeed::new();
    let tracker = track_own_location(&feed, markers.clone());

    let reader = match source {
        LocationSource::Fixed(fix) => {
            feed.publish_fix(fix);
            None
        }
        LocationSource::Stdin => {
            let feed = feed.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = read_fixes(BufReader::new(tokio::io::stdin()), &feed).await {
                    warn!(error = %e, "Failed to read locations from stdin");
                }
            }))
        }
    };

    let handle = SyncLoop::new(
        MarkerSync::new(backend, markers.clone()),
        Arc::new(store),
        Arc::new(feed.clone()),
    )
    .with_interval(cfg.interval())
    .spawn();
    info!(server = %cfg.server, "Syncing marker, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Stopping marker sync");
    handle.shutdown().await;
    if let Some(reader) = reader {
        reader.abort();
    }
    tracker.abort();

    let markers = markers.snapshot();
    if !markers.is_empty() {
        let str = OutputFormat::Table.render(markers.iter().map(MarkerRow::new))?;
        println!("{str}");
    }
    Ok(())
}
