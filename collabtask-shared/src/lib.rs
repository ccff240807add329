//! # collabtask shared library
//!
//! Types and business logic shared by the collabtask API server and the
//! realtime client.
//!
//! ## Module Organization
//!
//! - `models`: Persisted records (users, tasks, notifications, audit log)
//! - `store`: The durable store abstraction with PostgreSQL and in-memory backends
//! - `db`: PostgreSQL pool and migrations
//! - `auth`: Password hashing, JWT tokens, request identity
//! - `events`: Domain events and the realtime wire format
//! - `realtime`: Connection registry and event fan-out
//! - `service`: Task mutation and account services

pub mod auth;
pub mod db;
pub mod events;
pub mod models;
pub mod realtime;
pub mod service;
pub mod store;

/// Current version of the collabtask shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
