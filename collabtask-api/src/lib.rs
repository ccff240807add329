//! # collabtask API server library
//!
//! HTTP and WebSocket surface of collabtask.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `routes`: API route handlers and the realtime channel

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
