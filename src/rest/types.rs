//! REST API request and response types.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HotcoinError;
use crate::types::serde_helpers::{decimal, optional_decimal};
use crate::types::{Direction, Offset, OrderPriceType};

// Envelopes

/// Outer response envelope: `{"code": 200, "msg": "...", "data": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Inner payload most endpoints wrap their data in:
/// `{"status": "ok", "data": ..., "ts": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Payload {
    pub status: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub ts: Option<i64>,
}

impl Payload {
    /// Check the status and decode the data.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, HotcoinError> {
        if self.status != "ok" {
            return Err(HotcoinError::InvalidResponse(format!(
                "API error: status={}",
                self.status
            )));
        }
        serde_json::from_value(self.data).map_err(|e| {
            HotcoinError::InvalidResponse(format!("Failed to parse payload data: {e}"))
        })
    }
}

// Public

/// Server time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ServerTime {
    /// Unix time in milliseconds.
    pub timestamp: i64,
}

/// Contract system status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemStatus {
    pub symbol: String,
    /// 1 normal, 2 maintenance.
    pub status: i32,
    #[serde(default)]
    pub heartbeat: i64,
}

impl SystemStatus {
    pub fn is_normal(&self) -> bool {
        self.status == 1
    }
}

/// Contract summary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contract {
    pub ticker: String,
    pub base_currency: String,
    pub quote_currency: String,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub last_price: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub base_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub quote_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub bid: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub ask: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub high: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub low: Option<Decimal>,
    #[serde(default)]
    pub product_type: String,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub open_interest: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub index_price: Option<Decimal>,
    #[serde(default)]
    pub index_currency: String,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub funding_rate: Option<Decimal>,
    #[serde(default)]
    pub contract_type: String,
}

// Account

/// Position detail, shared by the account and position endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PositionDetail {
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
    pub direction: Direction,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub last_price: Option<Decimal>,
    #[serde(default)]
    pub lever_rate: i32,
}

/// Margin account overview.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountInfo {
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
    #[serde(default)]
    pub margin_mode: Option<String>,
    #[serde(default)]
    pub position_mode: Option<String>,
    #[serde(default)]
    pub positions: Vec<PositionDetail>,
}

/// Balance of one margin asset. Note this endpoint uses camelCase keys.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
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
    pub risk_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub liquidation_price: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal::deserialize")]
    pub withdraw_available: Option<Decimal>,
    #[serde(default)]
    pub lever_rate: i32,
}

// Trading

/// Request to place an order.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub volume: Decimal,
    pub direction: Direction,
    pub offset: Offset,
    pub lever_rate: u32,
    pub order_price_type: OrderPriceType,
}

impl PlaceOrderRequest {
    /// Create a limit order request.
    pub fn limit(
        symbol: impl Into<String>,
        direction: Direction,
        offset: Offset,
        volume: Decimal,
        price: Decimal,
        lever_rate: u32,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            contract_type: None,
            contract_code: None,
            client_order_id: None,
            price: Some(price),
            volume,
            direction,
            offset,
            lever_rate,
            order_price_type: OrderPriceType::Limit,
        }
    }

    /// Create a market order request.
    pub fn market(
        symbol: impl Into<String>,
        direction: Direction,
        offset: Offset,
        volume: Decimal,
        lever_rate: u32,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            contract_type: None,
            contract_code: None,
            client_order_id: None,
            price: None,
            volume,
            direction,
            offset,
            lever_rate,
            order_price_type: OrderPriceType::Market,
        }
    }

    /// Set a client order ID.
    pub fn client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    /// Set the contract code, e.g. `BTC-USDT`.
    pub fn contract_code(mut self, code: impl Into<String>) -> Self {
        self.contract_code = Some(code.into());
        self
    }
}

/// Result of placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaceOrderResponse {
    #[serde(default)]
    pub order_id: serde_json::Value,
    #[serde(default)]
    pub order_id_str: String,
    #[serde(default)]
    pub client_order_id: Option<serde_json::Value>,
}

/// Request to cancel one or more orders.
///
/// Several ids may be given comma separated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CancelOrderRequest {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

impl CancelOrderRequest {
    /// Cancel by exchange order id.
    pub fn by_order_id(symbol: impl Into<String>, order_id: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            order_id: Some(order_id.into()),
            client_order_id: None,
        }
    }

    /// Cancel by client order id.
    pub fn by_client_order_id(symbol: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            order_id: None,
            client_order_id: Some(id.into()),
        }
    }
}

/// Per-order cancel failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CancelError {
    pub order_id: String,
    pub err_code: i64,
    #[serde(default)]
    pub err_msg: String,
}

/// Result of a cancel request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CancelOrderResponse {
    #[serde(default, deserialize_with = "successes")]
    pub successes: Vec<String>,
    #[serde(default)]
    pub errors: Vec<CancelError>,
}

/// `successes` is a list on some deployments and a comma separated string
/// on others.
fn successes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Successes {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Successes>::deserialize(deserializer)? {
        Some(Successes::List(ids)) => ids,
        Some(Successes::Joined(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    })
}
