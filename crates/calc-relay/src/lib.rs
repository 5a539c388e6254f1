//! # calc-relay
//!
//! WebSocket front end for the calculator stream server. Each attached
//! client gets a greeting, then every inbound message is parsed, forwarded
//! to the stream server through a [`BackendLink`], and answered with exactly
//! one reply. Backend failures become in-band error replies.

#![deny(unsafe_code)]

pub mod backend;
pub mod config;
pub mod handler;
pub mod health;
pub mod registry;
pub mod server;
pub mod session;

pub use backend::{BackendError, BackendLink};
pub use config::RelayConfig;
pub use registry::{ClientId, ClientRegistry};
pub use server::RelayServer;
