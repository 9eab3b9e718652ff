//! Access to the remote marker and messaging services
use crate::{
    error::{Error, Result},
    marker::Marker,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default upper bound for a single request to the backend
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Placeholder description given to markers created by the sync loop
pub const DEFAULT_MARKER_DESCRIPTION: &str = "test";

/// Operations on the markers stored by the backend
#[async_trait]
pub trait MarkerApi: Send + Sync {
    /// Fetch the markers visible to `username`. Returns `None` when the backend answers with
    /// something other than a list.
    async fn list_markers(&self, username: &str) -> Result<Option<Vec<Marker>>>;

    /// Check whether a marker with the given title exists. A backend that doesn't know the
    /// title at all answers with [Error::NotFound].
    async fn marker_exists(&self, title: &str) -> Result<bool>;

    async fn update_marker(&self, username: &str, latitude: f64, longitude: f64) -> Result<()>;

    async fn create_marker(&self, username: &str, marker: &NewMarker) -> Result<()>;
}

/// Submission of free-form status reports
#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn submit_message(&self, message: &str) -> Result<()>;
}

/// Body of the marker creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMarker {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "long")]
    pub longitude: f64,
    pub description: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMarker {
    new_latitude: f64,
    new_longitude: f64,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    #[serde(default)]
    data: Option<bool>,
}

/// Interpret the body of a marker listing. Anything but a JSON array means "no markers". Entries
/// that aren't marker objects at all are dropped, the rest of the list is kept.
fn parse_marker_list(body: &str) -> Result<Option<Vec<Marker>>> {
    let serde_json::Value::Array(entries) = serde_json::from_str(body)? else {
        trace!(%body, "marker listing is not a list");
        return Ok(None);
    };
    let markers = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Marker>(entry) {
            Ok(marker) => Some(marker),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed marker");
                None
            }
        })
        .collect();
    Ok(Some(markers))
}

// a failed listing still carries a body, which is interpreted like any other
async fn read_marker_list(response: Response) -> Result<Option<Vec<Marker>>> {
    parse_marker_list(&response.text().await?)
}

async fn read_exists(response: Response) -> Result<bool> {
    let exists: ExistsResponse = HttpBackend::check(response)?.json().await?;
    Ok(exists.data.unwrap_or_default())
}

/// A [MarkerApi] and [MessagingApi] talking to the backend over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(server: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(server).map_err(|e| Error::InvalidUrl(format!("{server}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidUrl(server.to_string()));
        }
        // so that joining segments never replaces the last part of a base path
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build a url below the server base from unescaped path segments
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn check(response: Response) -> Result<Response> {
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            s => Err(Error::Http { status: s.as_u16() }),
        }
    }
}

#[async_trait]
impl MarkerApi for HttpBackend {
    async fn list_markers(&self, username: &str) -> Result<Option<Vec<Marker>>> {
        let url = self.endpoint(&["marker", "getMarker", username]);
        debug!(%url, "listing markers");
        read_marker_list(self.client.get(url).send().await?).await
    }

    async fn marker_exists(&self, title: &str) -> Result<bool> {
        let mut url = self.endpoint(&["marker", "checkMarkerTitleExists"]);
        url.query_pairs_mut().append_pair("title", title);
        debug!(%url, "checking marker");
        read_exists(self.client.get(url).send().await?).await
    }

    async fn update_marker(&self, username: &str, latitude: f64, longitude: f64) -> Result<()> {
        let url = self.endpoint(&["marker", "updateMarker", username]);
        debug!(%url, latitude, longitude, "updating marker");
        let body = UpdateMarker {
            new_latitude: latitude,
            new_longitude: longitude,
        };
        Self::check(self.client.put(url).json(&body).send().await?)?;
        Ok(())
    }

    async fn create_marker(&self, username: &str, marker: &NewMarker) -> Result<()> {
        let url = self.endpoint(&["marker", username, "submitMarkerSP"]);
        debug!(%url, ?marker, "creating marker");
        Self::check(self.client.post(url).json(marker).send().await?)?;
        Ok(())
    }
}

#[async_trait]
impl MessagingApi for HttpBackend {
    async fn submit_message(&self, message: &str) -> Result<()> {
        let url = self.endpoint(&["messaging", "submit"]);
        debug!(%url, "submitting message");
        Self::check(
            self.client
                .post(url)
                .json(&MessageBody { message })
                .send()
                .await?,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use test_log::test;

    fn response(status: u16, body: &str) -> Response {
        Response::from(
            http::Response::builder()
                .status(status)
                .body(body.to_string())
                .expect("Failed to build response"),
        )
    }

    fn backend(server: &str) -> HttpBackend {
        HttpBackend::new(server, DEFAULT_TIMEOUT).expect("Failed to create backend")
    }

    #[test]
    fn endpoint_urls() {
        let b = backend("https://example.com");
        assert_eq!(
            b.endpoint(&["marker", "getMarker", "juan"]).as_str(),
            "https://example.com/marker/getMarker/juan"
        );
        assert_eq!(
            b.endpoint(&["marker", "juan dela cruz", "submitMarkerSP"]).as_str(),
            "https://example.com/marker/juan%20dela%20cruz/submitMarkerSP"
        );
        assert_eq!(
            b.endpoint(&["marker", "a/b"]).as_str(),
            "https://example.com/marker/a%2Fb"
        );

        let b = backend("http://localhost:8080/api");
        assert_eq!(
            b.endpoint(&["messaging", "submit"]).as_str(),
            "http://localhost:8080/api/messaging/submit"
        );
    }

    #[test]
    fn invalid_server() {
        assert!(matches!(
            HttpBackend::new("not a url", DEFAULT_TIMEOUT),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpBackend::new("mailto:someone@example.com", DEFAULT_TIMEOUT),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn request_bodies() {
        let marker = NewMarker {
            latitude: 15.5,
            longitude: 120.6,
            description: DEFAULT_MARKER_DESCRIPTION.to_string(),
            user_id: "42".to_string(),
            title: "juan".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&marker).unwrap(),
            json!({"lat": 15.5, "long": 120.6, "description": "test", "UserID": "42", "title": "juan"})
        );
        assert_eq!(
            serde_json::to_value(UpdateMarker {
                new_latitude: 1.0,
                new_longitude: 2.0
            })
            .unwrap(),
            json!({"newLatitude": 1.0, "newLongitude": 2.0})
        );
        assert_eq!(
            serde_json::to_value(MessageBody { message: "hi" }).unwrap(),
            json!({"message": "hi"})
        );
    }

    #[test]
    fn marker_list_shapes() {
        let markers = parse_marker_list(r#"[{"latitude": 1.0, "longitude": 2.0, "title": "PNP"}]"#)
            .expect("Failed to parse list");
        assert_eq!(markers, Some(vec![Marker::new(1.0, 2.0, "PNP")]));
        assert_eq!(parse_marker_list("[]").unwrap(), Some(vec![]));
        assert_eq!(
            parse_marker_list(r#"{"message": "No markers found"}"#).unwrap(),
            None
        );
        assert_eq!(parse_marker_list("null").unwrap(), None);
        assert!(parse_marker_list("<html>").is_err());
    }

    #[test]
    fn malformed_entries_keep_the_list() {
        let markers = parse_marker_list(
            r#"[
                {"latitude": 15.4, "longitude": 120.5, "title": "BFP"},
                {"latitude": 15.5, "longitude": 120.6, "title": null},
                {"longitude": 120.6, "title": "PNP"},
                {"latitude": "15.4", "longitude": "120.5", "title": "Medical"},
                42,
                "BFP"
            ]"#,
        )
        .expect("Failed to parse list")
        .expect("Listing should be a list");
        assert_eq!(
            markers,
            vec![
                Marker::new(15.4, 120.5, "BFP"),
                Marker::new(15.5, 120.6, ""),
                Marker::new(0.0, 120.6, "PNP"),
                Marker::new(15.4, 120.5, "Medical"),
            ]
        );
        assert!(!markers[2].is_displayable());
    }

    #[test]
    fn status_mapping() {
        assert!(HttpBackend::check(response(200, "")).is_ok());
        assert!(HttpBackend::check(response(201, "")).is_ok());
        assert!(matches!(
            HttpBackend::check(response(404, "")),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            HttpBackend::check(response(500, "")),
            Err(Error::Http { status: 500 })
        ));
        assert!(matches!(
            HttpBackend::check(response(400, "")),
            Err(Error::Http { status: 400 })
        ));
    }

    #[test(tokio::test)]
    async fn existence_check_responses() {
        assert!(read_exists(response(200, r#"{"data": true}"#)).await.unwrap());
        assert!(!read_exists(response(200, r#"{"data": false}"#)).await.unwrap());
        assert!(!read_exists(response(200, r#"{}"#)).await.unwrap());

        let missing = read_exists(response(404, r#"{"message": "Marker not found"}"#)).await;
        assert!(missing.as_ref().is_err_and(Error::is_not_found));

        let failed = read_exists(response(503, "")).await;
        assert!(matches!(failed, Err(Error::Http { status: 503 })));
        assert!(!failed.unwrap_err().is_not_found());

        assert!(matches!(
            read_exists(response(200, "<html>")).await,
            Err(Error::Request(_))
        ));
    }

    #[test(tokio::test)]
    async fn listing_body_is_read_regardless_of_status() {
        let markers = read_marker_list(response(
            500,
            r#"[{"latitude": 1.0, "longitude": 2.0, "title": "PNP"}]"#,
        ))
        .await
        .expect("Failed to read listing");
        assert_eq!(markers, Some(vec![Marker::new(1.0, 2.0, "PNP")]));

        let markers = read_marker_list(response(404, r#"{"message": "No markers"}"#))
            .await
            .expect("Failed to read listing");
        assert_eq!(markers, None);
    }

    #[test]
    fn exists_response() {
        let r: ExistsResponse = serde_json::from_str(r#"{"data": true}"#).unwrap();
        assert_eq!(r.data, Some(true));
        let r: ExistsResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(r.data, None);
    }
}
