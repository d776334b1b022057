//! # Sketchfall Client Library
//!
//! A headless terminal client for sketchfall. It keeps a mirror of the server's
//! world, logs a text summary whenever that mirror changes, and turns typed
//! commands into messages for the server.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The mirrored world: bodies with their outlines and latest poses, the drawing
//! zone, the current level and attempt, the last chat line and the loss banner.
//!
//! ### Input Module (`input`)
//! Parses one line of terminal input into a message or a quit request:
//! - `/shape <color> <mass> x,y x,y ...` draws a shape
//! - `/level <n>` asks for another level
//! - `/quit` leaves
//! - any other line is chat
//!
//! Lines the server would reject as frames (too long, reserved characters) are
//! refused before they are sent.
//!
//! ### Network Module (`network`)
//! Owns the TCP connection. A receive task applies server messages to the
//! world while the input loop sends commands; both share the world through one
//! `tokio::sync::RwLock`.
//!
//! ### Display Module (`display`)
//! Renders the world as lines of text.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1", shared::DEFAULT_PORT).await?;
//!     let world = client.world();
//!
//!     client.run().await?;
//!     println!("Finished on level {}", world.read().await.level);
//!     Ok(())
//! }
//! ```

pub mod display;
pub mod game;
pub mod input;
pub mod network;
