//! Error types for the HOTCOIN client library.

use thiserror::Error;

/// The main error type for all HOTCOIN client operations.
#[derive(Error, Debug)]
pub enum HotcoinError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Dial or handshake failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// WebSocket connection closed unexpectedly
    #[error("WebSocket connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the closure
        reason: String,
    },

    /// Request or handshake timeout
    #[error("Request timed out")]
    Timeout,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL or path could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An inbound frame looked gzip-compressed but could not be inflated
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// An inbound frame was not a valid envelope
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// The venue rejected the auth request
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// HOTCOIN API returned an error
    #[error("HOTCOIN API error: {0}")]
    Api(ApiError),

    /// Invalid response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request rejected locally before sending
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing required credentials
    #[error("Missing credentials: access key and secret key required for private endpoints")]
    MissingCredentials,

    /// `connect` called on a live session
    #[error("Already connected")]
    AlreadyConnected,

    /// Operation requires an open connection
    #[error("Not connected")]
    NotConnected,

    /// Topic is already in the active subscription set
    #[error("Already subscribed to {0}")]
    AlreadySubscribed(String),

    /// Private topic requested before the auth acknowledgment arrived
    #[error("Authentication required")]
    AuthenticationRequired,
}

/// Coarse classification of [`HotcoinError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or unusable configuration or request input.
    Configuration,
    /// Dial, handshake or transport failure.
    Connection,
    /// A single frame could not be decoded. The session continues.
    Protocol,
    /// The venue rejected authentication.
    Authentication,
    /// Operation invalid for the current connection state.
    State,
    /// REST transport or URL problems.
    Transport,
    /// The venue answered with an error envelope.
    Api,
}

impl HotcoinError {
    /// The taxonomy class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingCredentials | Self::InvalidRequest(_) => ErrorCategory::Configuration,
            Self::WebSocket(_)
            | Self::Connection(_)
            | Self::ConnectionClosed { .. }
            | Self::Timeout => ErrorCategory::Connection,
            Self::Decompression(_) | Self::MalformedFrame(_) => ErrorCategory::Protocol,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::AlreadyConnected
            | Self::NotConnected
            | Self::AlreadySubscribed(_)
            | Self::AuthenticationRequired => ErrorCategory::State,
            Self::Http(_)
            | Self::HttpMiddleware(_)
            | Self::Json(_)
            | Self::InvalidUrl(_)
            | Self::InvalidResponse(_) => ErrorCategory::Transport,
            Self::Api(_) => ErrorCategory::Api,
        }
    }

    /// Whether a streaming session survives this error.
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::Protocol
    }
}

impl From<url::ParseError> for HotcoinError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// HOTCOIN API error codes and messages.
///
/// These are errors returned by the HOTCOIN API itself in the response
/// envelope (`{"code": ..., "msg": ...}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Numeric code from the envelope (200 means success)
    pub code: i64,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl ApiError {
    /// Create a new API error from code and message.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Check if the venue rejected the credentials or signature.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.code, error_codes::UNAUTHORIZED | error_codes::FORBIDDEN)
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limit(&self) -> bool {
        self.code == error_codes::TOO_MANY_REQUESTS
    }
}

/// Known HOTCOIN envelope codes.
pub mod error_codes {
    pub const OK: i64 = 200;
    pub const BAD_REQUEST: i64 = 400;
    pub const UNAUTHORIZED: i64 = 401;
    pub const FORBIDDEN: i64 = 403;
    pub const TOO_MANY_REQUESTS: i64 = 429;
    pub const INTERNAL_ERROR: i64 = 500;
}
