//! Stream frame envelope, outbound control frames and the inbound decoder.

use std::io::Read;

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HotcoinError;

/// gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// Inbound

/// Generic inbound envelope.
///
/// Every field is optional and unknown fields are ignored, so control
/// frames (ping, auth ack, sub ack) and data frames (`ch` plus `tick` or
/// `data`) share one shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamFrame {
    /// Request id echoed back by the server.
    pub id: Option<serde_json::Value>,
    pub status: Option<String>,
    /// Topic acknowledged by a subscribe.
    pub subbed: Option<String>,
    /// Topic acknowledged by an unsubscribe.
    pub unsubbed: Option<String>,
    /// Server heartbeat; must be echoed back as a pong.
    pub ping: Option<i64>,
    pub pong: Option<i64>,
    pub rep: Option<String>,
    /// Channel (topic) of a data frame.
    pub ch: Option<String>,
    pub ts: Option<i64>,
    pub tick: Option<serde_json::Value>,
    pub data: Option<serde_json::Value>,
    pub op: Option<String>,
    #[serde(rename = "err-code")]
    pub err_code: Option<i64>,
    #[serde(rename = "err-msg")]
    pub err_msg: Option<String>,
}

impl StreamFrame {
    /// The channel this frame belongs to, if it is a data frame.
    pub fn channel(&self) -> Option<&str> {
        self.ch.as_deref()
    }

    /// Raw payload: `tick` when present, otherwise `data`.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.tick.as_ref().or(self.data.as_ref())
    }

    /// Decode the payload into a typed record.
    ///
    /// Returns `Ok(None)` when the frame carries no payload.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<Option<T>, HotcoinError> {
        self.payload()
            .map(|value| T::deserialize(value).map_err(HotcoinError::Json))
            .transpose()
    }
}

/// Decode a raw transport message into a [`StreamFrame`].
///
/// Messages starting with the gzip magic bytes are inflated first.
pub fn decode(raw: &[u8]) -> Result<StreamFrame, HotcoinError> {
    if raw.starts_with(&GZIP_MAGIC) {
        let inflated = inflate(raw)?;
        parse(&inflated)
    } else {
        parse(raw)
    }
}

fn inflate(raw: &[u8]) -> Result<Vec<u8>, HotcoinError> {
    let mut out = Vec::with_capacity(raw.len() * 4);
    GzDecoder::new(raw)
        .read_to_end(&mut out)
        .map_err(|e| HotcoinError::Decompression(e.to_string()))?;
    Ok(out)
}

fn parse(bytes: &[u8]) -> Result<StreamFrame, HotcoinError> {
    serde_json::from_slice(bytes).map_err(|e| HotcoinError::MalformedFrame(e.to_string()))
}

// Outbound

/// Auth request sent over the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// Always "auth".
    pub op: &'static str,
    /// Always "api".
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SignatureMethod")]
    pub signature_method: String,
    #[serde(rename = "SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Signature")]
    pub signature: String,
}

/// Control frames the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ControlFrame {
    Auth(AuthRequest),
    Subscribe { sub: String, id: String },
    Unsubscribe { unsub: String, id: String },
    Ping { ping: i64 },
    Pong { pong: i64 },
}

impl ControlFrame {
    pub fn subscribe(topic: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Subscribe {
            sub: topic.into(),
            id: id.into(),
        }
    }

    pub fn unsubscribe(topic: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Unsubscribe {
            unsub: topic.into(),
            id: id.into(),
        }
    }

    pub fn ping(millis: i64) -> Self {
        Self::Ping { ping: millis }
    }

    pub fn pong(value: i64) -> Self {
        Self::Pong { pong: value }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> Result<String, HotcoinError> {
        serde_json::to_string(self).map_err(HotcoinError::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decode_plain_ping() {
        let frame = decode(br#"{"ping":123456}"#).unwrap();
        assert_eq!(frame.ping, Some(123456));
        assert!(frame.op.is_none());
    }

    #[test]
    fn test_decode_gzip_frame() {
        let raw = gzip(br#"{"ch":"market.BTCUSDT.detail","ts":1700000000000,"tick":{"close":"1"}}"#);
        let frame = decode(&raw).unwrap();
        assert_eq!(frame.channel(), Some("market.BTCUSDT.detail"));
        assert_eq!(frame.ts, Some(1700000000000));
        assert!(frame.payload().is_some());
    }

    #[test]
    fn test_decode_auth_ack_fields() {
        let frame = decode(br#"{"op":"auth","err-code":0,"err-msg":"","unknown":true}"#).unwrap();
        assert_eq!(frame.op.as_deref(), Some("auth"));
        assert_eq!(frame.err_code, Some(0));
    }

    #[test]
    fn test_decode_corrupt_gzip() {
        let mut raw = gzip(br#"{"ping":1}"#);
        raw.truncate(6);
        let err = decode(&raw).unwrap_err();
        assert!(matches!(err, HotcoinError::Decompression(_)));
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = decode(b"not json").unwrap_err();
        assert!(matches!(err, HotcoinError::MalformedFrame(_)));

        let err = decode(&gzip(b"[1,2")).unwrap_err();
        assert!(matches!(err, HotcoinError::MalformedFrame(_)));
    }

    #[test]
    fn test_payload_prefers_tick() {
        let frame = decode(br#"{"tick":{"a":1},"data":{"b":2}}"#).unwrap();
        assert_eq!(frame.payload().unwrap()["a"], 1);

        let frame = decode(br#"{"ping":5}"#).unwrap();
        assert!(frame.payload_as::<serde_json::Value>().unwrap().is_none());
    }

    #[test]
    fn test_control_frame_json() {
        assert_eq!(ControlFrame::pong(123456).to_json().unwrap(), r#"{"pong":123456}"#);
        assert_eq!(ControlFrame::ping(7).to_json().unwrap(), r#"{"ping":7}"#);
        assert_eq!(
            ControlFrame::subscribe("market.BTCUSDT.detail", "sub_1").to_json().unwrap(),
            r#"{"sub":"market.BTCUSDT.detail","id":"sub_1"}"#
        );
        assert_eq!(
            ControlFrame::unsubscribe("orders.USDT", "unsub_2").to_json().unwrap(),
            r#"{"unsub":"orders.USDT","id":"unsub_2"}"#
        );
    }

    #[test]
    fn test_auth_request_json() {
        let frame = ControlFrame::Auth(AuthRequest {
            op: "auth",
            kind: "api",
            access_key_id: "key".into(),
            signature_method: "HmacSHA256".into(),
            signature_version: "2".into(),
            timestamp: "2023-01-01T00:00:00.000Z".into(),
            signature: "sig".into(),
        });
        let value: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value["op"], "auth");
        assert_eq!(value["type"], "api");
        assert_eq!(value["AccessKeyId"], "key");
        assert_eq!(value["SignatureMethod"], "HmacSHA256");
        assert_eq!(value["SignatureVersion"], "2");
        assert_eq!(value["Timestamp"], "2023-01-01T00:00:00.000Z");
        assert_eq!(value["Signature"], "sig");
    }
}
