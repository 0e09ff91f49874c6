//! REST API endpoint constants.

/// Base URL for the HOTCOIN perpetual API.
pub const BASE_URL: &str = "https://api-ct.hotcoin.fit";

/// Public endpoints (no authentication required).
pub mod public {
    /// Server time.
    pub const TIMESTAMP: &str = "/api/v1/timestamp";

    /// System status per contract.
    pub const API_STATE: &str = "/api/v1/perpetual/public/api-state";

    /// Contract summaries.
    pub const CONTRACTS: &str = "/api/v1/perpetual/public/contracts";
}

/// Private endpoints (signed).
pub mod private {
    /// Margin account overview.
    pub const ACCOUNT_INFO: &str = "/api/v1/perpetual/account/info";

    /// Balances per margin asset.
    pub const ACCOUNT_BALANCE: &str = "/api/v1/perpetual/account/balance";

    /// Open positions.
    pub const POSITIONS: &str = "/api/v1/perpetual/positions";

    /// Place an order.
    pub const ORDERS: &str = "/api/v1/perpetual/orders";

    /// Cancel orders.
    pub const CANCEL_ORDER: &str = "/api/v1/perpetual/orders/cancel";
}
