//! Bearer-token authorization gate for a reverse proxy.
//!
//! Requests pass through an audit layer, an authorization layer and an optional
//! basic-auth rewrite before they are forwarded to a single backend.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
