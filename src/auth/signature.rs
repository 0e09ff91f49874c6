//! HMAC-SHA256 request signing for HOTCOIN private endpoints.
//!
//! Every private call carries five extra query parameters. Three of them are
//! fixed by the signing step, the fourth is the caller's access key, and the
//! last is the signature itself:
//!
//! ```text
//! canonical = UPPER(method) "\n" lower(host) "\n" path "\n" sorted_query
//! Signature = Base64(HMAC-SHA256(canonical, secret_key))
//! ```
//!
//! `sorted_query` is the parameter set ordered by key bytes, each key and
//! value escaped with [`query_escape`] and joined as `k=v` pairs with `&`.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::error::HotcoinError;

type HmacSha256 = Hmac<Sha256>;

/// Ordered parameter map. `String` ordering is byte order, which is what the
/// canonical query string requires.
pub type Params = BTreeMap<String, String>;

pub const SIGNATURE_METHOD: &str = "HmacSHA256";
pub const SIGNATURE_VERSION: &str = "2";

/// Query keys the signing protocol owns.
pub mod keys {
    pub const ACCESS_KEY_ID: &str = "AccessKeyId";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VERSION: &str = "SignatureVersion";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const SIGNATURE: &str = "Signature";
}

/// Everything except `A-Z a-z 0-9 - _ . ~` is escaped.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape a query key or value the way a form encoder does: unreserved
/// bytes pass through, space becomes `+`, everything else is `%XX`.
pub fn query_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for chunk in utf8_percent_encode(input, QUERY_ESCAPE) {
        if chunk == "%20" {
            out.push('+');
        } else {
            out.push_str(chunk);
        }
    }
    out
}

/// Build the canonical query string: keys in ascending byte order, each
/// key and value escaped with [`query_escape`], joined with `&`.
pub fn canonical_query_string(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", query_escape(key), query_escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the exact string that gets HMAC-signed.
pub fn canonical_string(method: &str, host: &str, path: &str, params: &Params) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        method.to_uppercase(),
        host.to_lowercase(),
        path,
        canonical_query_string(params)
    )
}

/// Format a timestamp as `YYYY-MM-DDTHH:mm:ss.sssZ` in UTC.
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second(),
        utc.millisecond()
    )
}

/// Format a timestamp as `YYYY-MM-DDTHH:mm:ss` in UTC, the form the stream
/// auth frame carries.
pub fn format_timestamp_seconds(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second()
    )
}

/// A signed request: the augmented parameter set plus its signature.
///
/// `params` holds the caller's parameters and the three fixed signing keys,
/// but not `Signature` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: String,
    pub host: String,
    pub path: String,
    pub params: Params,
    pub signature: String,
}

impl SignedRequest {
    /// The timestamp the signature was computed at.
    pub fn timestamp(&self) -> &str {
        self.params
            .get(keys::TIMESTAMP)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// All query parameters to send, `Signature` included.
    pub fn into_query_params(mut self) -> Params {
        self.params
            .insert(keys::SIGNATURE.to_string(), self.signature);
        self.params
    }
}

/// Computes request signatures with a shared secret.
#[derive(Clone)]
pub struct SignatureEngine {
    secret_key: secrecy::SecretString,
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl SignatureEngine {
    /// Create an engine keyed with the given secret.
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secrecy::SecretString::from(secret_key.into()),
        }
    }

    /// Create an engine from API credentials.
    pub fn from_credentials(credentials: &crate::auth::Credentials) -> Self {
        Self::new(credentials.expose_secret())
    }

    /// Sign a request at the current instant.
    ///
    /// The caller's `params` are left untouched; the returned
    /// [`SignedRequest`] carries a copy with `SignatureMethod`,
    /// `SignatureVersion` and `Timestamp` added.
    pub fn sign(
        &self,
        method: &str,
        host: &str,
        path: &str,
        params: &Params,
    ) -> Result<SignedRequest, HotcoinError> {
        self.sign_at(method, host, path, params, OffsetDateTime::now_utc())
    }

    /// Sign a request with an explicit timestamp.
    pub fn sign_at(
        &self,
        method: &str,
        host: &str,
        path: &str,
        params: &Params,
        at: OffsetDateTime,
    ) -> Result<SignedRequest, HotcoinError> {
        self.sign_with_timestamp(method, host, path, params, &format_timestamp(at))
    }

    /// Sign a request with a pre-formatted `Timestamp` value.
    ///
    /// The value is signed and returned exactly as given.
    pub fn sign_with_timestamp(
        &self,
        method: &str,
        host: &str,
        path: &str,
        params: &Params,
        timestamp: &str,
    ) -> Result<SignedRequest, HotcoinError> {
        let mut params = params.clone();
        params.insert(keys::SIGNATURE_METHOD.to_string(), SIGNATURE_METHOD.to_string());
        params.insert(keys::SIGNATURE_VERSION.to_string(), SIGNATURE_VERSION.to_string());
        params.insert(keys::TIMESTAMP.to_string(), timestamp.to_string());

        let canonical = canonical_string(method, host, path, &params);
        let signature = self.sign_canonical(&canonical)?;

        Ok(SignedRequest {
            method: method.to_uppercase(),
            host: host.to_lowercase(),
            path: path.to_string(),
            params,
            signature,
        })
    }

    /// HMAC-SHA256 the canonical string and base64 the digest.
    pub fn sign_canonical(&self, canonical: &str) -> Result<String, HotcoinError> {
        use secrecy::ExposeSecret;

        let mut hmac = HmacSha256::new_from_slice(self.secret_key.expose_secret().as_bytes())
            .map_err(|e| HotcoinError::Authentication(format!("Invalid HMAC key: {e}")))?;
        hmac.update(canonical.as_bytes());
        Ok(BASE64.encode(hmac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const HOST: &str = "api-ct.example.com";
    const PATH: &str = "/api/v1/perpetual/private/account";

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_string_matches_reference() {
        let params = params(&[
            ("SignatureMethod", "HmacSHA256"),
            ("SignatureVersion", "2"),
            ("Timestamp", "2023-01-01T00:00:00.000Z"),
            ("AccessKeyId", "test_key"),
        ]);

        let canonical = canonical_string("GET", HOST, PATH, &params);
        assert_eq!(
            canonical,
            "GET\napi-ct.example.com\n/api/v1/perpetual/private/account\n\
             AccessKeyId=test_key&SignatureMethod=HmacSHA256&SignatureVersion=2\
             &Timestamp=2023-01-01T00%3A00%3A00.000Z"
        );
    }

    #[test]
    fn test_canonical_string_normalizes_method_and_host() {
        let canonical = canonical_string("get", "API-CT.Example.COM", "/Path", &Params::new());
        assert_eq!(canonical, "GET\napi-ct.example.com\n/Path\n");
    }

    #[test]
    fn test_query_keys_sorted_by_byte_order() {
        // Upper-case letters sort before lower-case ones in byte order.
        let params = params(&[("b", "2"), ("a", "1"), ("Z", "0"), ("aa", "3")]);
        assert_eq!(canonical_query_string(&params), "Z=0&a=1&aa=3&b=2");
    }

    #[test]
    fn test_query_escape_form_style() {
        assert_eq!(query_escape("a b"), "a+b");
        assert_eq!(query_escape("BTC-USDT"), "BTC-USDT");
        assert_eq!(query_escape("x_y.z~"), "x_y.z~");
        assert_eq!(query_escape("a*b"), "a%2Ab");
        assert_eq!(query_escape("a/b:c"), "a%2Fb%3Ac");
        assert_eq!(query_escape("1+1=2&"), "1%2B1%3D2%26");
        assert_eq!(query_escape("%20"), "%2520");
        assert_eq!(query_escape("é"), "%C3%A9");
    }

    #[test]
    fn test_format_timestamp_millis() {
        let at = datetime!(2024-03-05 07:08:09.120 UTC);
        assert_eq!(format_timestamp(at), "2024-03-05T07:08:09.120Z");

        let at = datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(format_timestamp(at), "2024-03-05T07:08:09.000Z");
    }

    #[test]
    fn test_format_timestamp_converts_to_utc() {
        let at = datetime!(2024-03-05 09:00:00.5 +02:00);
        assert_eq!(format_timestamp(at), "2024-03-05T07:00:00.500Z");
    }

    #[test]
    fn test_format_timestamp_seconds() {
        let at = datetime!(2024-03-05 09:08:09.999 +02:00);
        assert_eq!(format_timestamp_seconds(at), "2024-03-05T07:08:09");
    }

    #[test]
    fn test_sign_with_timestamp_keeps_value_verbatim() {
        let engine = SignatureEngine::new("test_secret_key");
        let signed = engine
            .sign_with_timestamp(
                "GET",
                HOST,
                PATH,
                &params(&[("AccessKeyId", "test_key")]),
                "2023-01-01T00:00:00",
            )
            .unwrap();

        assert_eq!(signed.timestamp(), "2023-01-01T00:00:00");
        let canonical = canonical_string("GET", HOST, PATH, &signed.params);
        assert!(canonical.ends_with("&Timestamp=2023-01-01T00%3A00%3A00"));
        assert_eq!(signed.signature, engine.sign_canonical(&canonical).unwrap());
    }

    #[test]
    fn test_sign_injects_fixed_keys_without_mutating_input() {
        let engine = SignatureEngine::new("test_secret_key");
        let input = params(&[("AccessKeyId", "test_key")]);

        let signed = engine.sign("GET", HOST, PATH, &input).unwrap();

        assert_eq!(input.len(), 1);
        assert_eq!(signed.params.len(), 4);
        assert_eq!(signed.params[keys::SIGNATURE_METHOD], "HmacSHA256");
        assert_eq!(signed.params[keys::SIGNATURE_VERSION], "2");

        let ts = signed.timestamp();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
        assert_eq!(&ts[19..20], ".");
        assert!(ts[20..23].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_signature_matches_manual_hmac() {
        let engine = SignatureEngine::new("test_secret_key");
        let at = datetime!(2023-01-01 00:00:00 UTC);
        let signed = engine
            .sign_at("GET", HOST, PATH, &params(&[("AccessKeyId", "test_key")]), at)
            .unwrap();

        let canonical = canonical_string("GET", HOST, PATH, &signed.params);
        let mut mac = HmacSha256::new_from_slice(b"test_secret_key").unwrap();
        mac.update(canonical.as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());

        assert_eq!(signed.signature, expected);
        // SHA-256 digest is 32 bytes, 44 chars once base64 encoded with padding.
        assert_eq!(signed.signature.len(), 44);
        assert!(signed.signature.ends_with('='));
    }

    #[test]
    fn test_signature_consistency() {
        let engine = SignatureEngine::new("my_secret");
        let at = datetime!(2023-06-01 12:00:00.001 UTC);
        let p = params(&[("symbol", "btcusdt")]);

        let sig1 = engine.sign_at("GET", HOST, PATH, &p, at).unwrap();
        let sig2 = engine.sign_at("GET", HOST, PATH, &p, at).unwrap();
        assert_eq!(sig1.signature, sig2.signature);
    }

    #[test]
    fn test_signature_changes_with_timestamp() {
        let engine = SignatureEngine::new("my_secret");
        let p = params(&[("symbol", "btcusdt")]);

        let sig1 = engine
            .sign_at("GET", HOST, PATH, &p, datetime!(2023-06-01 12:00:00.001 UTC))
            .unwrap();
        let sig2 = engine
            .sign_at("GET", HOST, PATH, &p, datetime!(2023-06-01 12:00:00.002 UTC))
            .unwrap();
        assert_ne!(sig1.signature, sig2.signature);
    }

    #[test]
    fn test_signature_changes_with_path() {
        let engine = SignatureEngine::new("my_secret");
        let at = datetime!(2023-06-01 12:00:00 UTC);

        let sig1 = engine.sign_at("GET", HOST, PATH, &Params::new(), at).unwrap();
        let sig2 = engine
            .sign_at("GET", HOST, "/api/v1/perpetual/account/balance", &Params::new(), at)
            .unwrap();
        assert_ne!(sig1.signature, sig2.signature);
    }

    #[test]
    fn test_into_query_params_adds_signature() {
        let engine = SignatureEngine::new("my_secret");
        let signed = engine.sign("POST", HOST, PATH, &Params::new()).unwrap();
        let signature = signed.signature.clone();

        let query = signed.into_query_params();
        assert_eq!(query[keys::SIGNATURE], signature);
        assert_eq!(query.len(), 4);
    }
}
