//! # Sketchfall Server Library
//!
//! The authoritative server for sketchfall, a cooperative physics puzzle where
//! players draw shapes that fall into a level and try to make them touch the
//! level's target.
//!
//! ## Architecture
//!
//! A single task owns all game state and reacts to three kinds of events: a new
//! connection, a frame (or framing failure) from a connection, and the
//! simulation tick. Per-connection tasks only move bytes, so the session and
//! the physics world never need locks.
//!
//! ## Module Organization
//!
//! - `level`: level description files and where they are loaded from
//! - `physics`: the rigid-body world for one level, win detection and teardown
//! - `session`: level switching, attempt counting and who receives what
//! - `client_manager`: connected players and their outbound frame queues
//! - `config`: server settings
//! - `network`: the listener, connection tasks and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!
//!     // Returns once every player that joined has left.
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod level;
pub mod network;
pub mod physics;
pub mod session;
