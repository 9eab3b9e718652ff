//! Map markers for response units and the icons used to display them
use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};
use std::{
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use strum_macros::{Display, EnumIter, EnumString};

const ASSISTANCE_REQUEST_SUFFIX: &str = " Assistance Request";

/// A point on the map for a response unit or for a request for assistance
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Marker {
    #[serde(alias = "lat", default, deserialize_with = "lenient_coordinate")]
    pub latitude: f64,
    #[serde(alias = "long", default, deserialize_with = "lenient_coordinate")]
    pub longitude: f64,
    #[serde(default, deserialize_with = "lenient_title")]
    pub title: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseCoordinate {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseTitle {
    Text(String),
    Other(IgnoredAny),
}

// The backend occasionally stores markers without usable coordinates. Keep them in the list but
// treat them like the map does, as unplaceable (zero).
fn lenient_coordinate<'de, D>(de: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LooseCoordinate>::deserialize(de)? {
        Some(LooseCoordinate::Number(n)) => n,
        Some(LooseCoordinate::Text(s)) => s.trim().parse().unwrap_or_default(),
        Some(LooseCoordinate::Other(_)) | None => 0.0,
    })
}

fn lenient_title<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LooseTitle>::deserialize(de)? {
        Some(LooseTitle::Text(s)) => s,
        Some(LooseTitle::Other(_)) | None => String::new(),
    })
}

impl Marker {
    pub fn new(latitude: f64, longitude: f64, title: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            title: title.into(),
        }
    }

    /// Markers with a zero coordinate are never placed on the map
    pub fn is_displayable(&self) -> bool {
        self.latitude != 0.0 && self.longitude != 0.0
    }

    pub fn icon(&self) -> Option<MarkerIcon> {
        MarkerIcon::for_title(&self.title)
    }

    pub fn agency(&self) -> Option<Agency> {
        Agency::from_title(&self.title)
    }

    pub fn is_assistance_request(&self) -> bool {
        self.title.ends_with(ASSISTANCE_REQUEST_SUFFIX) && self.agency().is_some()
    }
}

/// The response agencies that have their own marker category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Agency {
    /// Bureau of Fire Protection
    #[strum(serialize = "BFP")]
    Bfp,
    /// Philippine National Police
    #[strum(serialize = "PNP")]
    Pnp,
    Medical,
    /// National Disaster Risk Reduction and Management Council
    #[strum(serialize = "NDRRMC")]
    Ndrrmc,
    /// Provincial Disaster Risk Reduction and Management Office
    #[strum(serialize = "PDRRMO")]
    Pdrrmo,
}

impl Agency {
    /// Find the agency for a marker title. Both the plain agency name ("PNP") and the request
    /// variant ("PNP Assistance Request") are recognized. Matching is exact.
    pub fn from_title(title: &str) -> Option<Self> {
        let name = title.strip_suffix(ASSISTANCE_REQUEST_SUFFIX).unwrap_or(title);
        Agency::from_str(name).ok()
    }

    pub fn icon(self) -> MarkerIcon {
        match self {
            Self::Bfp => MarkerIcon::Fire,
            Self::Pnp => MarkerIcon::Police,
            Self::Medical => MarkerIcon::Medical,
            Self::Ndrrmc | Self::Pdrrmo => MarkerIcon::DisasterResponse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum MarkerIcon {
    Fire,
    Police,
    Medical,
    #[strum(serialize = "disaster-response")]
    DisasterResponse,
}

impl MarkerIcon {
    /// Look up the icon for a marker title. Unknown titles have no icon.
    pub fn for_title(title: &str) -> Option<Self> {
        Agency::from_title(title).map(Agency::icon)
    }

    pub fn asset(&self) -> &'static str {
        match self {
            Self::Fire => "fire.png",
            Self::Police => "police.webp",
            Self::Medical => "medic.png",
            Self::DisasterResponse => "ndrrmc.png",
        }
    }
}

/// The in-memory, ordered list of markers shown on the map. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MarkerCollection(Arc<Mutex<Vec<Marker>>>);

impl MarkerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Marker>> {
        // a panic while holding the lock can't leave the list half-written
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, marker: Marker) {
        self.lock().push(marker);
    }

    /// Replace the whole list, e.g. with the markers fetched from the backend
    pub fn replace(&self, markers: Vec<Marker>) {
        *self.lock() = markers;
    }

    pub fn snapshot(&self) -> Vec<Marker> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
