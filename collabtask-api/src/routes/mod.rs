/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, logout and profile
/// - `tasks`: Task CRUD and audit trail
/// - `notifications`: Persisted notifications of the caller
/// - `realtime`: WebSocket channel carrying task events

pub mod auth;
pub mod health;
pub mod notifications;
pub mod realtime;
pub mod tasks;
