//! HOTCOIN perpetual REST API client.
//!
//! Private calls are signed into the query string; see
//! [`build_auth_url`](crate::auth::build_auth_url).

mod client;
mod endpoints;
mod types;

pub use client::{RestClient, RestClientBuilder};
pub use endpoints::*;
pub use types::*;
