//! # calc-server
//!
//! TCP stream server for the calculator protocol: newline-delimited JSON,
//! one [`calc_core::Session`] per connection, graceful shutdown through a
//! shared [`ShutdownCoordinator`]. Also ships [`StreamClient`], the client
//! side of the same protocol.

#![deny(unsafe_code)]

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod server;
pub mod shutdown;

pub use client::{ClientError, StreamClient};
pub use codec::{Frame, FrameError, JsonLinesCodec};
pub use config::ServerConfig;
pub use connection::handle_connection;
pub use server::CalcServer;
pub use shutdown::ShutdownCoordinator;
