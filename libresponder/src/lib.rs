//! This is a library that keeps an emergency responder's own map marker in sync with the
//! device's live location, fetches the markers of the other response units and submits status
//! reports to the messaging backend.

pub mod backend;
pub mod error;
pub mod identity;
pub mod location;
pub mod marker;
pub mod submit;
pub mod sync;

pub use error::Error;
pub use error::Result;

/// The backend that the mobile client talked to originally
pub const DEFAULT_SERVER: &str = "https://fearless-growth-production.up.railway.app";
