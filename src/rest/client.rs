//! HOTCOIN REST API client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_tracing::TracingMiddleware;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{CredentialsProvider, Params, SignatureEngine, build_auth_url, canonical_query_string};
use crate::error::{ApiError, HotcoinError, error_codes};
use crate::rest::endpoints::{BASE_URL, private, public};
use crate::rest::types::*;

/// The HOTCOIN perpetual REST API client.
///
/// # Example
///
/// ```rust,no_run
/// use hotcoin_api_client::rest::RestClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = RestClient::new();
///     let time = client.get_server_time().await?;
///     println!("server time: {}", time.timestamp);
///     Ok(())
/// }
/// ```
///
/// For private endpoints, provide credentials:
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use hotcoin_api_client::auth::StaticCredentials;
/// use hotcoin_api_client::rest::RestClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = RestClient::builder()
///         .credentials(Arc::new(StaticCredentials::new("access_key", "secret_key")))
///         .build();
///
///     let account = client.get_account_info(Some("USDT")).await?;
///     println!("margin balance: {}", account.margin_balance);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RestClient {
    http_client: ClientWithMiddleware,
    base_url: String,
    credentials: Option<Arc<dyn CredentialsProvider>>,
}

impl RestClient {
    /// Create a client for public endpoints with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // HTTP request methods.

    /// Unsigned GET. Returns the envelope's `data`.
    pub async fn public_get<T>(&self, path: &str, params: &Params) -> Result<T, HotcoinError>
    where
        T: DeserializeOwned,
    {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        let mut all_params: Params = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        all_params.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        if all_params.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&canonical_query_string(&all_params)));
        }

        self.send(self.http_client.get(url.as_str())).await
    }

    /// Signed GET.
    pub async fn private_get<T>(&self, path: &str, params: &Params) -> Result<T, HotcoinError>
    where
        T: DeserializeOwned,
    {
        let url = self.signed_url("GET", path, params)?;
        self.send(self.http_client.get(url.as_str())).await
    }

    /// Signed POST with a JSON body. The signature covers the query only.
    pub async fn private_post<T, B>(&self, path: &str, body: &B) -> Result<T, HotcoinError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.signed_url("POST", path, &Params::new())?;
        let body = serde_json::to_vec(body)?;
        self.send(
            self.http_client
                .post(url.as_str())
                .header(CONTENT_TYPE, "application/json")
                .body(body),
        )
        .await
    }

    /// Signed DELETE.
    pub async fn private_delete<T>(&self, path: &str, params: &Params) -> Result<T, HotcoinError>
    where
        T: DeserializeOwned,
    {
        let url = self.signed_url("DELETE", path, params)?;
        self.send(self.http_client.delete(url.as_str())).await
    }

    fn signed_url(&self, method: &str, path: &str, params: &Params) -> Result<Url, HotcoinError> {
        let credentials = self
            .credentials
            .as_ref()
            .map(|provider| provider.get_credentials())
            .filter(|creds| creds.is_complete())
            .ok_or(HotcoinError::MissingCredentials)?;

        let engine = SignatureEngine::from_credentials(credentials);
        build_auth_url(
            &engine,
            method,
            &self.base_url,
            path,
            &credentials.access_key,
            params,
        )
    }

    async fn send<T>(&self, request: RequestBuilder) -> Result<T, HotcoinError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        self.parse_response(response).await
    }

    /// Parse the `{code, msg, data}` envelope.
    async fn parse_response<T>(&self, response: reqwest::Response) -> Result<T, HotcoinError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await?;

        let envelope: ResponseEnvelope = serde_json::from_str(&body).map_err(|e| {
            if !status.is_success() {
                HotcoinError::InvalidResponse(format!("HTTP {}: {}", status, body))
            } else {
                HotcoinError::InvalidResponse(format!(
                    "Failed to parse response: {}. Body: {}",
                    e, body
                ))
            }
        })?;

        if envelope.code != error_codes::OK {
            return Err(HotcoinError::Api(ApiError::new(envelope.code, envelope.msg)));
        }

        serde_json::from_value(envelope.data).map_err(|e| {
            HotcoinError::InvalidResponse(format!("Failed to parse response data: {}", e))
        })
    }

    // Public endpoints.

    /// Get the server time.
    pub async fn get_server_time(&self) -> Result<ServerTime, HotcoinError> {
        let payload: Payload = self.public_get(public::TIMESTAMP, &Params::new()).await?;
        payload.into_data()
    }

    /// Get system status, optionally for one contract.
    pub async fn get_system_status(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<SystemStatus>, HotcoinError> {
        let payload: Payload = self
            .public_get(public::API_STATE, &symbol_params(symbol))
            .await?;
        payload.into_data()
    }

    /// Get contract summaries.
    ///
    /// This endpoint returns the list directly in `data`.
    pub async fn get_contracts(&self) -> Result<Vec<Contract>, HotcoinError> {
        self.public_get(public::CONTRACTS, &Params::new()).await
    }

    // Private endpoints.

    /// Get the margin account overview, optionally for one margin asset.
    pub async fn get_account_info(&self, symbol: Option<&str>) -> Result<AccountInfo, HotcoinError> {
        let payload: Payload = self
            .private_get(private::ACCOUNT_INFO, &symbol_params(symbol))
            .await?;
        payload.into_data()
    }

    /// Get balances, optionally for one margin asset.
    pub async fn get_account_balance(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<AccountBalance>, HotcoinError> {
        let payload: Payload = self
            .private_get(private::ACCOUNT_BALANCE, &symbol_params(symbol))
            .await?;
        payload.into_data()
    }

    /// Get open positions, optionally for one contract.
    pub async fn get_positions(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<PositionDetail>, HotcoinError> {
        let payload: Payload = self
            .private_get(private::POSITIONS, &symbol_params(symbol))
            .await?;
        payload.into_data()
    }

    /// Place an order.
    pub async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<PlaceOrderResponse, HotcoinError> {
        if request.symbol.is_empty() {
            return Err(HotcoinError::InvalidRequest("symbol is required".into()));
        }
        let payload: Payload = self.private_post(private::ORDERS, request).await?;
        payload.into_data()
    }

    /// Cancel orders by exchange id or client id.
    pub async fn cancel_order(
        &self,
        request: &CancelOrderRequest,
    ) -> Result<CancelOrderResponse, HotcoinError> {
        if request.order_id.is_none() && request.client_order_id.is_none() {
            return Err(HotcoinError::InvalidRequest(
                "order_id or client_order_id is required".into(),
            ));
        }
        let payload: Payload = self.private_post(private::CANCEL_ORDER, request).await?;
        payload.into_data()
    }
}

fn symbol_params(symbol: Option<&str>) -> Params {
    let mut params = Params::new();
    if let Some(symbol) = symbol.filter(|s| !s.is_empty()) {
        params.insert("symbol".to_string(), symbol.to_string());
    }
    params
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

/// Builder for [`RestClient`].
pub struct RestClientBuilder {
    base_url: String,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    user_agent: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl RestClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            credentials: None,
            user_agent: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the credentials provider for signed requests.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries for transient failures.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Build the client.
    pub fn build(self) -> RestClient {
        let mut headers = HeaderMap::new();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("hotcoin-api-client/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("hotcoin-api-client"));
        headers.insert(USER_AGENT, header_value);

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(self.max_retries);

        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        RestClient {
            http_client: client,
            base_url: self.base_url,
            credentials: self.credentials,
        }
    }
}

impl Default for RestClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;

    #[test]
    fn test_builder_defaults() {
        let client = RestClient::new();
        assert_eq!(client.base_url(), "https://api-ct.hotcoin.fit");
        assert!(client.credentials.is_none());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = RestClient::builder().base_url("http://127.0.0.1:9000/").build();
        assert_eq!(client.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_signed_url_requires_credentials() {
        let client = RestClient::new();
        let err = client
            .signed_url("GET", private::ACCOUNT_INFO, &Params::new())
            .unwrap_err();
        assert!(matches!(err, HotcoinError::MissingCredentials));

        let client = RestClient::builder()
            .credentials(Arc::new(StaticCredentials::new("key", "")))
            .build();
        let err = client
            .signed_url("GET", private::ACCOUNT_INFO, &Params::new())
            .unwrap_err();
        assert!(matches!(err, HotcoinError::MissingCredentials));
    }

    #[test]
    fn test_signed_url_carries_access_key() {
        let client = RestClient::builder()
            .credentials(Arc::new(StaticCredentials::new("key", "secret")))
            .build();
        let url = client
            .signed_url("GET", private::POSITIONS, &symbol_params(Some("btcusdt")))
            .unwrap();

        assert_eq!(url.path(), "/api/v1/perpetual/positions");
        let query = url.query().unwrap();
        assert!(query.contains("AccessKeyId=key"));
        assert!(query.contains("symbol=btcusdt"));
        assert!(query.contains("Signature="));
    }

    #[test]
    fn test_symbol_params() {
        assert!(symbol_params(None).is_empty());
        assert!(symbol_params(Some("")).is_empty());
        assert_eq!(symbol_params(Some("USDT"))["symbol"], "USDT");
    }
}
