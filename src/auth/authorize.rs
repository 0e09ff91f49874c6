//! Authenticated URL assembly for private REST calls.

use url::Url;

use crate::auth::signature::{Params, SignatureEngine, canonical_query_string, keys};
use crate::error::HotcoinError;

/// Build a fully authenticated request URL.
///
/// `base_url + path` is parsed, `AccessKeyId` is added to `params`, the set
/// is signed, and the signed parameters (with `Signature`) become the URL's
/// query string. Pairs already present in the parsed URL are folded into the
/// signed set so each parameter appears exactly once.
///
/// # Example
///
/// ```rust
/// use hotcoin_api_client::auth::{Params, SignatureEngine, build_auth_url};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = SignatureEngine::new("secret");
/// let mut params = Params::new();
/// params.insert("symbol".into(), "BTC-USDT".into());
///
/// let url = build_auth_url(
///     &engine,
///     "GET",
///     "https://api-ct.hotcoin.fit",
///     "/api/v1/perpetual/account/info",
///     "access_key",
///     &params,
/// )?;
/// assert!(url.as_str().contains("symbol=BTC-USDT"));
/// # Ok(())
/// # }
/// ```
pub fn build_auth_url(
    engine: &SignatureEngine,
    method: &str,
    base_url: &str,
    path: &str,
    access_key: &str,
    params: &Params,
) -> Result<Url, HotcoinError> {
    let mut url = Url::parse(&format!("{base_url}{path}"))?;
    let host = signing_host(&url)?;

    let mut all_params: Params = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    all_params.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
    all_params.insert(keys::ACCESS_KEY_ID.to_string(), access_key.to_string());

    let signed = engine.sign(method, &host, url.path(), &all_params)?;
    let query = canonical_query_string(&signed.into_query_params());
    url.set_query(Some(&query));

    Ok(url)
}

/// The host component as the signature covers it, port included when
/// the URL carries a non-default one.
pub(crate) fn signing_host(url: &Url) -> Result<String, HotcoinError> {
    let host = url
        .host_str()
        .ok_or_else(|| HotcoinError::InvalidUrl(format!("{url} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
