//! Handlers for the commands that talk to the backend
pub(crate) mod markers;
pub(crate) mod submit;
pub(crate) mod sync;
