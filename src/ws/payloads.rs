//! Typed payloads carried in the `tick`/`data` field of data frames.
//!
//! Decode on demand with [`StreamFrame::payload_as`](crate::ws::StreamFrame::payload_as).

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::serde_helpers::{decimal, optional_decimal, string_or_i64};

/// A `[price, quantity]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PriceLevel(
    #[serde(deserialize_with = "decimal::deserialize")] pub Decimal,
    #[serde(deserialize_with = "decimal::deserialize")] pub Decimal,
);

impl PriceLevel {
    pub fn price(&self) -> Decimal {
        self.0
    }

    pub fn quantity(&self) -> Decimal {
        self.1
    }
}

/// Candle from `market.<symbol>.kline.<period>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsKline {
    /// Candle open time, used as the candle id.
    pub id: i64,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub open: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub close: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub high: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub low: Decimal,
    /// Traded quantity.
    #[serde(deserialize_with = "decimal::deserialize")]
    pub amount: Decimal,
    /// Traded value.
    #[serde(deserialize_with = "decimal::deserialize")]
    pub vol: Decimal,
    #[serde(default)]
    pub count: i64,
}

/// Book snapshot from `market.<symbol>.depth.<type>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsDepth {
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub ts: i64,
}

impl WsDepth {
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }
}

/// Batch of trades from `market.<symbol>.trade.detail`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsTrade {
    pub id: i64,
    pub ts: i64,
    #[serde(default)]
    pub data: Vec<WsTradeItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsTradeItem {
    pub id: i64,
    pub ts: i64,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub price: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub amount: Decimal,
    /// Aggressor side, `buy` or `sell`.
    pub direction: String,
}

/// Rolling 24h summary from `market.<symbol>.detail`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsTicker {
    pub id: i64,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub open: Decimal,
    /// Last traded price.
    #[serde(deserialize_with = "decimal::deserialize")]
    pub close: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub high: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub low: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub amount: Decimal,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub vol: Decimal,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub bid: Option<PriceLevel>,
    #[serde(default)]
    pub ask: Option<PriceLevel>,
}

/// Order update from `orders.<symbol>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsOrder {
    pub symbol: String,
    #[serde(default)]
    pub contract_code: String,
    #[serde(default)]
    pub contract_type: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub volume: Decimal,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub order_price_type: String,
    pub direction: String,
    #[serde(default)]
    pub offset: String,
    pub status: i32,
    #[serde(default)]
    pub lever_rate: i32,
    #[serde(deserialize_with = "string_or_i64::deserialize")]
    pub order_id: i64,
    #[serde(default)]
    pub order_id_str: String,
    #[serde(default)]
    pub client_order_id: Option<i64>,
    #[serde(default)]
    pub order_source: String,
    #[serde(default)]
    pub order_type: i32,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub trade_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub trade_turnover: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub fee: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub trade_avg_price: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub margin_frozen: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub profit: Option<Decimal>,
}

/// Position update from `positions.<symbol>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsPosition {
    pub symbol: String,
    #[serde(default)]
    pub contract_code: String,
    #[serde(default)]
    pub contract_type: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub volume: Decimal,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub available: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub frozen: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub cost_open: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub cost_hold: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub profit_unreal: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub profit_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub profit: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub position_margin: Option<Decimal>,
    #[serde(default)]
    pub lever_rate: i32,
    pub direction: String,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub last_price: Option<Decimal>,
}

/// Margin account update from `accounts.<symbol>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WsAccount {
    /// Margin asset, e.g. `USDT`.
    pub symbol: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub margin_balance: Decimal,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub margin_static: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub margin_position: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub margin_frozen: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub margin_available: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub profit_real: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub profit_unreal: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub withdraw_available: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub risk_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub liquidation_price: Option<Decimal>,
    #[serde(default)]
    pub lever_rate: i32,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub adjust_factor: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::frame::decode;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_kline_from_frame() {
        let raw = br#"{"ch":"market.btcusdt.kline.1min","ts":1700000000000,
            "tick":{"id":1700000000,"open":"42000.1","close":"42010","high":"42050",
            "low":"41990.5","amount":"12.5","vol":"525000","count":88}}"#;
        let frame = decode(raw).unwrap();
        let kline: WsKline = frame.payload_as().unwrap().unwrap();

        assert_eq!(kline.id, 1700000000);
        assert_eq!(kline.open, dec("42000.1"));
        assert_eq!(kline.low, dec("41990.5"));
        assert_eq!(kline.count, 88);
    }

    #[test]
    fn test_depth_levels() {
        let raw = br#"{"ch":"market.btcusdt.depth.step0","tick":{
            "bids":[["41999.5","1.2"],["41999","3"]],
            "asks":[["42000","0.5"]],"version":77,"ts":1700000000123}}"#;
        let depth: WsDepth = decode(raw).unwrap().payload_as().unwrap().unwrap();

        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.best_bid().unwrap().price(), dec("41999.5"));
        assert_eq!(depth.best_ask().unwrap().quantity(), dec("0.5"));
        assert_eq!(depth.version, 77);
    }

    #[test]
    fn test_trade_batch() {
        let raw = br#"{"ch":"market.btcusdt.trade.detail","tick":{"id":9,"ts":1700000000000,
            "data":[{"id":91,"ts":1700000000001,"price":"42000","amount":"0.01","direction":"buy"},
                    {"id":92,"ts":1700000000002,"price":"41999","amount":"0.02","direction":"sell"}]}}"#;
        let trade: WsTrade = decode(raw).unwrap().payload_as().unwrap().unwrap();

        assert_eq!(trade.data.len(), 2);
        assert_eq!(trade.data[1].direction, "sell");
        assert_eq!(trade.data[1].amount, dec("0.02"));
    }

    #[test]
    fn test_ticker_with_top_of_book() {
        let raw = br#"{"ch":"market.btcusdt.detail","tick":{"id":1,"open":"1","close":"2",
            "high":"3","low":"0.5","amount":"10","vol":"20","count":5,
            "bid":["1.9","4"],"ask":["2.1","6"]}}"#;
        let ticker: WsTicker = decode(raw).unwrap().payload_as().unwrap().unwrap();

        assert_eq!(ticker.close, dec("2"));
        assert_eq!(ticker.bid.unwrap().price(), dec("1.9"));
        assert_eq!(ticker.ask.unwrap().quantity(), dec("6"));
    }

    #[test]
    fn test_order_update_from_data_field() {
        let raw = br#"{"ch":"orders.btcusdt","ts":1700000000000,"data":{
            "symbol":"btcusdt","contract_code":"BTC-USDT","volume":"3","price":"42000",
            "direction":"buy","offset":"open","status":3,"lever_rate":10,
            "order_id":"784017187857756160","order_id_str":"784017187857756160",
            "trade_volume":"","fee":"0.12"}}"#;
        let order: WsOrder = decode(raw).unwrap().payload_as().unwrap().unwrap();

        assert_eq!(order.order_id, 784017187857756160);
        assert_eq!(order.price, Some(dec("42000")));
        assert!(order.trade_volume.is_none());
        assert_eq!(order.fee, Some(dec("0.12")));
        assert_eq!(order.lever_rate, 10);
    }

    #[test]
    fn test_position_and_account_updates() {
        let raw = br#"{"ch":"positions.btcusdt","data":{"symbol":"btcusdt","volume":"2",
            "available":"1","direction":"sell","profit_unreal":"-3.5","lever_rate":20}}"#;
        let position: WsPosition = decode(raw).unwrap().payload_as().unwrap().unwrap();
        assert_eq!(position.profit_unreal, Some(dec("-3.5")));
        assert!(position.cost_open.is_none());

        let raw = br#"{"ch":"accounts.usdt","data":{"symbol":"USDT","margin_balance":"1000.25",
            "margin_available":"800","risk_rate":"","lever_rate":5}}"#;
        let account: WsAccount = decode(raw).unwrap().payload_as().unwrap().unwrap();
        assert_eq!(account.margin_balance, dec("1000.25"));
        assert_eq!(account.margin_available, Some(dec("800")));
        assert!(account.risk_rate.is_none());
    }

    #[test]
    fn test_mismatched_payload_is_an_error() {
        let raw = br#"{"ch":"market.btcusdt.detail","tick":{"id":1}}"#;
        assert!(decode(raw).unwrap().payload_as::<WsTicker>().is_err());
    }
}
