//! The device location as seen by the rest of the library
use crate::{
    error::{Error, Result},
    marker::{Marker, MarkerCollection},
};
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::watch,
    task::JoinHandle,
};
use tracing::{debug, trace, warn};

/// A single position reported by the location sensor
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Label derived by the sensor from the fix, shown as the title of the own-location marker
    pub title: String,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, title: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            title: title.into(),
        }
    }

    /// Parse a fix from a line of the form `lat,long[,title]`
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.splitn(3, ',').map(str::trim);
        let mut coordinate = |name: &str| -> Result<f64> {
            let part = parts
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| Error::Validation(format!("missing {name} in '{line}'")))?;
            part.parse::<f64>()
                .map_err(|_| Error::Validation(format!("invalid {name} '{part}'")))
        };
        let latitude = coordinate("latitude")?;
        let longitude = coordinate("longitude")?;
        let title = parts.next().unwrap_or_default().to_string();
        Self::checked(latitude, longitude, title)
    }

    /// Like [LocationFix::new], but rejects coordinates that are not on the globe
    pub fn checked(latitude: f64, longitude: f64, title: impl Into<String>) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::Validation(format!(
                "coordinates out of range: {latitude},{longitude}"
            )));
        }
        Ok(Self::new(latitude, longitude, title))
    }
}

/// Everything the location sensor currently knows
#[derive(Debug, Clone, PartialEq)]
pub struct LocationState {
    pub fix: Option<LocationFix>,
    /// Permission or sensor error to show to the user
    pub error: Option<String>,
    /// Set until the sensor has produced either a fix or an error
    pub fetching: bool,
}

impl Default for LocationState {
    fn default() -> Self {
        Self {
            fix: None,
            error: None,
            fetching: true,
        }
    }
}

/// Source of the device's current location
pub trait LocationProvider: Send + Sync {
    fn current(&self) -> LocationState;

    fn current_fix(&self) -> Option<LocationFix> {
        self.current().fix
    }
}

/// A live location stream. Producers publish into the feed, consumers either take snapshots
/// through [LocationProvider] or [subscribe](LocationFeed::subscribe) to every change.
#[derive(Debug, Clone)]
pub struct LocationFeed {
    tx: watch::Sender<LocationState>,
}

impl Default for LocationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationFeed {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LocationState::default());
        Self { tx }
    }

    pub fn publish_fix(&self, fix: LocationFix) {
        trace!(?fix, "location update");
        self.tx.send_modify(|state| {
            state.fix = Some(fix);
            state.error = None;
            state.fetching = false;
        });
    }

    pub fn publish_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "location error");
        self.tx.send_modify(|state| {
            state.error = Some(message);
            state.fetching = false;
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<LocationState> {
        self.tx.subscribe()
    }
}

impl LocationProvider for LocationFeed {
    fn current(&self) -> LocationState {
        self.tx.borrow().clone()
    }
}

/// Publish a fix for every line read from `reader` until it is exhausted. Lines that can't be
/// parsed are reported as location errors and skipped; blank lines are ignored.
pub async fn read_fixes<R>(reader: R, feed: &LocationFeed) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match LocationFix::parse(&line) {
            Ok(fix) => feed.publish_fix(fix),
            Err(e) => feed.publish_error(e.to_string()),
        }
    }
    debug!("location source exhausted");
    Ok(())
}

/// Append a marker for the device's own position every time the feed produces a new fix with
/// non-zero coordinates and a title. Earlier entries for the same title are kept.
pub fn track_own_location(feed: &LocationFeed, markers: MarkerCollection) -> JoinHandle<()> {
    let mut rx = feed.subscribe();
    tokio::spawn(async move {
        let mut last: Option<LocationFix> = None;
        loop {
            let fix = rx.borrow_and_update().fix.clone();
            if let Some(fix) = fix
                && last.as_ref() != Some(&fix)
            {
                if fix.latitude != 0.0 && fix.longitude != 0.0 && !fix.title.is_empty() {
                    markers.push(Marker::new(fix.latitude, fix.longitude, fix.title.clone()));
                }
                last = Some(fix);
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use test_log::test;

    #[test]
    fn parse_fix_lines() {
        assert_eq!(
            LocationFix::parse("15.4817, 120.5979, Accuracy 5m").unwrap(),
            LocationFix::new(15.4817, 120.5979, "Accuracy 5m")
        );
        assert_eq!(
            LocationFix::parse("15.4817,120.5979").unwrap(),
            LocationFix::new(15.4817, 120.5979, "")
        );
        // titles may contain commas
        assert_eq!(
            LocationFix::parse("1,2,a, b").unwrap().title,
            "a, b".to_string()
        );
        assert!(LocationFix::parse("15.4817").is_err());
        assert!(LocationFix::parse("abc,120").is_err());
        assert!(LocationFix::parse("91,120").is_err());
        assert!(LocationFix::parse("15,181").is_err());
    }

    #[test]
    fn feed_state_transitions() {
        let feed = LocationFeed::new();
        let state = feed.current();
        assert!(state.fetching);
        assert_eq!(state.fix, None);

        feed.publish_error("permission denied");
        let state = feed.current();
        assert!(!state.fetching);
        assert_eq!(state.error.as_deref(), Some("permission denied"));

        feed.publish_fix(LocationFix::new(1.0, 2.0, "here"));
        let state = feed.current();
        assert_eq!(state.error, None);
        assert_eq!(feed.current_fix(), Some(LocationFix::new(1.0, 2.0, "here")));
    }

    #[test(tokio::test)]
    async fn read_fixes_from_lines() {
        let feed = LocationFeed::new();
        let input: &[u8] = b"1.0,2.0,first\n\nbogus\n3.0,4.0,last\n";
        read_fixes(input, &feed).await.expect("Failed to read fixes");
        assert_eq!(feed.current_fix(), Some(LocationFix::new(3.0, 4.0, "last")));
        assert_eq!(feed.current().error, None);

        let input: &[u8] = b"bogus\n";
        read_fixes(input, &feed).await.expect("Failed to read fixes");
        assert!(feed.current().error.is_some());
        // the previous fix survives a bad line
        assert_eq!(feed.current_fix(), Some(LocationFix::new(3.0, 4.0, "last")));
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[test(tokio::test)]
    async fn own_location_markers_accumulate() {
        let feed = LocationFeed::new();
        let markers = MarkerCollection::new();
        let task = track_own_location(&feed, markers.clone());

        feed.publish_fix(LocationFix::new(1.0, 2.0, "me"));
        settle().await;
        feed.publish_fix(LocationFix::new(1.5, 2.5, "me"));
        settle().await;
        // no title, no marker
        feed.publish_fix(LocationFix::new(1.6, 2.6, ""));
        settle().await;
        // an error without a new fix doesn't append anything
        feed.publish_error("gps lost");
        settle().await;

        assert_eq!(
            markers.snapshot(),
            vec![Marker::new(1.0, 2.0, "me"), Marker::new(1.5, 2.5, "me")]
        );

        drop(feed);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("tracker didn't stop")
            .expect("tracker panicked");
    }
}
