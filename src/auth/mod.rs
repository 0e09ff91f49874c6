//! Authentication module for the HOTCOIN API.
//!
//! This module provides:
//! - Credential management with secure secret storage
//! - HMAC-SHA256 signature generation over the canonical request string
//! - Authenticated URL assembly for private REST calls

mod authorize;
mod credentials;
mod signature;

pub use authorize::build_auth_url;
pub(crate) use authorize::signing_host;
pub use credentials::{
    ACCESS_KEY_VAR, Credentials, CredentialsProvider, EnvCredentials, SECRET_KEY_VAR,
    StaticCredentials,
};
pub use signature::{
    Params, SIGNATURE_METHOD, SIGNATURE_VERSION, SignatureEngine, SignedRequest,
    canonical_query_string, canonical_string, format_timestamp, format_timestamp_seconds, keys,
    query_escape,
};
