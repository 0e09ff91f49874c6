//! # HOTCOIN Client
//!
//! An async Rust client library for the HOTCOIN perpetual futures REST and
//! WebSocket APIs.
//!
//! ## Features
//!
//! - Request signing (HMAC-SHA256 over the canonical request string)
//! - Streaming session with gzip frame decoding, heartbeats, and
//!   subscription tracking
//! - Signed REST client with retries and request tracing
//! - Financial precision with `rust_decimal`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hotcoin_api_client::ws::{StreamSession, WsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = StreamSession::new(WsConfig::default());
//!     session.on_message(|frame| println!("{:?}", frame.channel()));
//!     session.connect().await?;
//!     session.subscribe_depth("btcusdt", "step0").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod rest;
pub mod types;
pub mod ws;

// Re-export commonly used types at crate root
pub use error::{ErrorCategory, HotcoinError};
pub use types::common::{Direction, Offset, OrderPriceType};

/// Result type alias using HotcoinError
pub type Result<T> = std::result::Result<T, HotcoinError>;
