//! HOTCOIN perpetual stream client.
//!
//! A [`StreamSession`] owns one WebSocket connection. Inbound frames may be
//! gzip-compressed; they are inflated, parsed into a [`StreamFrame`] and
//! routed by priority: server pings are answered inline, auth and
//! subscription acknowledgments update session state, everything else is
//! delivered to the message handler.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hotcoin_api_client::auth::EnvCredentials;
//! use hotcoin_api_client::ws::{StreamSession, WsConfig, WsTicker, topics};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = StreamSession::with_credentials(
//!         WsConfig::default(),
//!         Arc::new(EnvCredentials::from_env()),
//!     );
//!
//!     session.on_message(|frame| {
//!         if frame.channel() == Some(topics::ticker("btcusdt").as_str()) {
//!             if let Ok(Some(ticker)) = frame.payload_as::<WsTicker>() {
//!                 println!("last price: {}", ticker.close);
//!             }
//!         }
//!     });
//!
//!     session.connect().await?;
//!     session.subscribe_ticker("btcusdt").await?;
//!     session.authenticate().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod dispatch;
mod frame;
mod heartbeat;
mod payloads;
mod request_id;
mod session;
mod subscriptions;
pub mod topics;

pub use config::{HANDSHAKE_TIMEOUT, WsConfig, WsConfigBuilder};
pub use dispatch::{ConnectionHandler, ErrorHandler, FrameAction, MessageHandler, classify};
pub use frame::{AuthRequest, ControlFrame, StreamFrame, decode};
pub use payloads::{
    PriceLevel, WsAccount, WsDepth, WsKline, WsOrder, WsPosition, WsTicker, WsTrade, WsTradeItem,
};
pub use session::{ConnectionState, StreamSession};
pub use subscriptions::SubscriptionRegistry;

/// Stream endpoints.
pub mod endpoints {
    /// Linear swap stream.
    pub const WS_LINEAR_SWAP: &str = "wss://api-ct.hotcoin.fit/linear-swap-ws";

    /// Path covered by the stream auth signature.
    pub const AUTH_PATH: &str = "/api/v1/perpetual/notification";
}
