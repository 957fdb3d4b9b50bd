//! RecyFi HTTP server
//!
//! Marshals the captive-portal HTTP surface into ledger calls: deposit
//! recording, session queries, and stats polling. Routing mirrors the three
//! route groups of the portal (`/bottle`, `/user`, `/stats`) plus `/health`.

#![forbid(unsafe_code)]

pub mod config;
pub mod gateway;
pub mod routes;
pub mod server;

pub use config::ServerConfig;
pub use gateway::{AccessGateway, LoggingGateway};
pub use server::{router, serve, AppState};
