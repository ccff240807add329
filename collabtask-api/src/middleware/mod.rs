/// Middleware for the API server
///
/// Authentication lives in [`crate::app`] because it needs the application
/// state; this module holds the stateless layers.

pub mod security;
