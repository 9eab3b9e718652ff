use libresponder::marker::Marker;
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct MarkerRow {
    title: String,
    latitude: f64,
    longitude: f64,
    icon: String,
    request: bool,
}

impl MarkerRow {
    pub(crate) fn new(marker: &Marker) -> Self {
        Self {
            title: marker.title.clone(),
            latitude: marker.latitude,
            longitude: marker.longitude,
            icon: marker.icon().map(|i| i.to_string()).unwrap_or_default(),
            request: marker.is_assistance_request(),
        }
    }
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct StatusRow {
    server: String,
    config: String,
    identity_file: String,
    username: String,
    user_id: String,
}

impl StatusRow {
    pub(crate) fn new(
        server: String,
        config: String,
        identity_file: String,
        identity: Option<&libresponder::identity::Identity>,
    ) -> Self {
        Self {
            server,
            config,
            identity_file,
            username: identity.map(|i| i.username.clone()).unwrap_or_default(),
            user_id: identity.map(|i| i.user_id.clone()).unwrap_or_default(),
        }
    }
}
