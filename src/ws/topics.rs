//! Topic naming.
//!
//! Market topics are public. Account-scoped topics (`orders.*`,
//! `positions.*`, `accounts.*`) need an authenticated session.

/// Prefixes of topics that require authentication.
pub const PRIVATE_PREFIXES: [&str; 3] = ["orders.", "positions.", "accounts."];

/// `market.<symbol>.kline.<period>`, e.g. period `1min`, `1hour`.
pub fn kline(symbol: &str, period: &str) -> String {
    format!("market.{symbol}.kline.{period}")
}

/// `market.<symbol>.depth.<depth_type>`, e.g. depth type `step0`.
pub fn depth(symbol: &str, depth_type: &str) -> String {
    format!("market.{symbol}.depth.{depth_type}")
}

/// `market.<symbol>.trade.detail`
pub fn trade(symbol: &str) -> String {
    format!("market.{symbol}.trade.detail")
}

/// `market.<symbol>.detail`
pub fn ticker(symbol: &str) -> String {
    format!("market.{symbol}.detail")
}

/// `orders.<symbol>`
pub fn orders(symbol: &str) -> String {
    format!("orders.{symbol}")
}

/// `positions.<symbol>`
pub fn positions(symbol: &str) -> String {
    format!("positions.{symbol}")
}

/// `accounts.<symbol>`
pub fn accounts(symbol: &str) -> String {
    format!("accounts.{symbol}")
}

/// Whether subscribing to `topic` requires an authenticated session.
pub fn is_private_topic(topic: &str) -> bool {
    PRIVATE_PREFIXES.iter().any(|prefix| topic.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_topics() {
        assert_eq!(kline("BTCUSDT", "1min"), "market.BTCUSDT.kline.1min");
        assert_eq!(depth("BTCUSDT", "step0"), "market.BTCUSDT.depth.step0");
        assert_eq!(trade("BTCUSDT"), "market.BTCUSDT.trade.detail");
        assert_eq!(ticker("BTCUSDT"), "market.BTCUSDT.detail");
    }

    #[test]
    fn test_account_topics() {
        assert_eq!(orders("USDT"), "orders.USDT");
        assert_eq!(positions("USDT"), "positions.USDT");
        assert_eq!(accounts("USDT"), "accounts.USDT");
    }

    #[test]
    fn test_private_classification() {
        assert!(is_private_topic(&orders("USDT")));
        assert!(is_private_topic(&positions("btcusdt")));
        assert!(is_private_topic(&accounts("USDT")));
        assert!(!is_private_topic(&ticker("BTCUSDT")));
        assert!(!is_private_topic("market.orders.detail"));
        assert!(!is_private_topic("orders"));
    }
}
