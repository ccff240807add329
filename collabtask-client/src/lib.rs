//! # collabtask client
//!
//! Consumer side of the collabtask realtime channel: keeps a local copy of
//! the task list and the user's notifications consistent with the server.
//!
//! ## Module Organization
//!
//! - `api`: REST calls (login, task list, task update)
//! - `cache`: Task list cache with invalidation and optimistic updates
//! - `notifications`: Notification panel and auto-expiring toasts
//! - `reconciler`: Applies pushed events to the cache and notifications
//! - `socket`: WebSocket connection with join handshake and reconnection
//! - `view`: Filtering, ordering and counts for display
//! - `config`: Environment configuration

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod notifications;
pub mod reconciler;
pub mod socket;
pub mod view;

pub use api::{HttpTaskApi, Session, TaskApi};
pub use error::{ClientError, ClientResult};
pub use reconciler::Reconciler;
pub use socket::{RealtimeClient, ReconnectPolicy};
