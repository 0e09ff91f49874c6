//! Stream session: connection lifecycle, reader task and outbound frames.

use std::future::Future;
use std::sync::{Arc, MutexGuard, PoisonError};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::{
    Credentials, CredentialsProvider, Params, SIGNATURE_METHOD, SIGNATURE_VERSION,
    SignatureEngine, format_timestamp_seconds, keys, signing_host,
};
use crate::error::HotcoinError;
use crate::ws::config::{HANDSHAKE_TIMEOUT, WsConfig};
use crate::ws::dispatch::{EventHandlers, FrameAction, classify};
use crate::ws::frame::{self, AuthRequest, ControlFrame, StreamFrame};
use crate::ws::heartbeat::{ControlSink, supervise_heartbeat};
use crate::ws::request_id::RequestIds;
use crate::ws::subscriptions::SubscriptionRegistry;
use crate::ws::topics;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsReceiver = SplitStream<WsStream>;
type SharedSink = Arc<Mutex<WsSink>>;

/// Lifecycle of a stream session.
///
/// Ordered: a state compares greater than every state it can only be
/// reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Authenticated,
}

impl ConnectionState {
    /// `Connected` or `Authenticated`.
    pub fn is_connected(self) -> bool {
        self >= Self::Connected
    }
}

/// Connection handle and state, guarded together.
struct Link {
    state: ConnectionState,
    /// Bumped on every successful connect.
    generation: u64,
    sink: Option<SharedSink>,
}

/// What `detach` hands back to the caller that won the teardown.
struct Detached {
    sink: Option<SharedSink>,
}

/// Background tasks of one connection.
struct ConnectionTasks {
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    heartbeat: Option<JoinHandle<()>>,
}

impl ConnectionTasks {
    /// Signal both tasks and wait until the reader has stopped.
    async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.reader.await {
            tracing::warn!("Reader task ended abnormally: {}", err);
        }
        if let Some(heartbeat) = self.heartbeat {
            if let Err(err) = heartbeat.await {
                tracing::warn!("Heartbeat task ended abnormally: {}", err);
            }
        }
    }
}

struct SessionInner {
    config: WsConfig,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    /// Serializes connect/disconnect and owns the running tasks.
    transitions: Mutex<Option<ConnectionTasks>>,
    link: std::sync::Mutex<Link>,
    subscriptions: SubscriptionRegistry,
    handlers: EventHandlers,
    request_ids: RequestIds,
}

impl SessionInner {
    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ConnectionState {
        self.link().state
    }

    fn set_state(&self, state: ConnectionState) {
        self.link().state = state;
    }

    /// Install a fresh transport and return its generation.
    fn attach(&self, sink: SharedSink) -> u64 {
        let mut link = self.link();
        link.generation += 1;
        link.state = ConnectionState::Connected;
        link.sink = Some(sink);
        link.generation
    }

    /// Move to `Disconnected` and clear subscriptions in one step.
    ///
    /// Returns `None` when already disconnected, or when `generation` names
    /// a connection that has since been replaced.
    fn detach(&self, generation: Option<u64>) -> Option<Detached> {
        let mut link = self.link();
        if link.state == ConnectionState::Disconnected {
            return None;
        }
        if generation.is_some_and(|g| g != link.generation) {
            return None;
        }
        link.state = ConnectionState::Disconnected;
        self.subscriptions.clear();
        Some(Detached {
            sink: link.sink.take(),
        })
    }

    fn mark_authenticated(&self, generation: u64) -> bool {
        let mut link = self.link();
        if link.generation == generation && link.state == ConnectionState::Connected {
            link.state = ConnectionState::Authenticated;
            true
        } else {
            false
        }
    }

    /// State and generation, read under one lock.
    fn snapshot(&self) -> (ConnectionState, u64) {
        let link = self.link();
        (link.state, link.generation)
    }

    /// The live sink, restricted to `generation` when given.
    fn current_sink(&self, generation: Option<u64>) -> Option<SharedSink> {
        let link = self.link();
        let current = generation.is_none_or(|g| g == link.generation);
        if link.state.is_connected() && current {
            link.sink.clone()
        } else {
            None
        }
    }

    async fn send_frame(&self, frame: &ControlFrame) -> Result<(), HotcoinError> {
        self.send_frame_on(frame, None).await
    }

    /// Send on the connection `generation` names; `NotConnected` once it
    /// has been replaced.
    async fn send_frame_on(
        &self,
        frame: &ControlFrame,
        generation: Option<u64>,
    ) -> Result<(), HotcoinError> {
        let json = frame.to_json()?;
        let sink = self
            .current_sink(generation)
            .ok_or(HotcoinError::NotConnected)?;

        let mut sink = sink.lock().await;
        sink.send(WsMessage::Text(json.into()))
            .await
            .map_err(HotcoinError::WebSocket)?;
        tracing::debug!("Sent control frame: {:?}", frame);
        Ok(())
    }

    fn auth_frame(&self, credentials: &Credentials) -> Result<ControlFrame, HotcoinError> {
        let url = Url::parse(&self.config.url)?;
        let host = signing_host(&url)?;

        let mut params = Params::new();
        params.insert(keys::ACCESS_KEY_ID.to_string(), credentials.access_key.clone());
        let timestamp = format_timestamp_seconds(OffsetDateTime::now_utc());
        let signed = SignatureEngine::from_credentials(credentials).sign_with_timestamp(
            "GET",
            &host,
            &self.config.auth_path,
            &params,
            &timestamp,
        )?;

        Ok(ControlFrame::Auth(AuthRequest {
            op: "auth",
            kind: "api",
            access_key_id: credentials.access_key.clone(),
            signature_method: SIGNATURE_METHOD.to_string(),
            signature_version: SIGNATURE_VERSION.to_string(),
            timestamp: signed.timestamp().to_string(),
            signature: signed.signature,
        }))
    }

    async fn handle_raw(&self, raw: &[u8], generation: u64) {
        match frame::decode(raw) {
            Ok(frame) => self.dispatch(frame, generation).await,
            Err(err) => {
                tracing::warn!("Dropping undecodable frame: {}", err);
                self.handlers.emit_error(&err);
            }
        }
    }

    async fn dispatch(&self, frame: StreamFrame, generation: u64) {
        match classify(&frame) {
            FrameAction::Pong(value) => {
                let pong = ControlFrame::pong(value);
                if let Err(err) = self.send_frame_on(&pong, Some(generation)).await {
                    self.handlers.emit_error(&err);
                }
            }
            FrameAction::AuthAccepted => {
                if self.mark_authenticated(generation) {
                    tracing::info!("Stream authenticated");
                }
            }
            FrameAction::AuthRejected(message) => {
                tracing::warn!("Stream authentication rejected: {}", message);
                self.handlers
                    .emit_error(&HotcoinError::Authentication(message));
            }
            FrameAction::Subscribed(topic) => tracing::debug!("Subscribed to {}", topic),
            FrameAction::Unsubscribed(topic) => tracing::debug!("Unsubscribed from {}", topic),
            FrameAction::Deliver => self.handlers.emit_message(frame),
        }
    }

    /// Reader-side teardown after the transport failed or closed.
    fn transport_lost(&self, generation: u64, err: HotcoinError, cancel: &CancellationToken) {
        cancel.cancel();
        tracing::warn!("Stream transport lost: {}", err);
        if self.detach(Some(generation)).is_some() {
            self.handlers.emit_error(&err);
            self.handlers.emit_disconnected();
        }
    }
}

impl ControlSink for SessionInner {
    fn send_control(
        &self,
        frame: &ControlFrame,
    ) -> impl Future<Output = Result<(), HotcoinError>> + Send {
        self.send_frame(frame)
    }
}

async fn run_reader(
    inner: Arc<SessionInner>,
    mut receiver: WsReceiver,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = receiver.next() => message,
        };

        match message {
            Some(Ok(WsMessage::Text(text))) => inner.handle_raw(text.as_bytes(), generation).await,
            Some(Ok(WsMessage::Binary(data))) => inner.handle_raw(&data, generation).await,
            // Transport-level ping/pong is answered by tungstenite.
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
            Some(Ok(WsMessage::Close(close))) => {
                let reason = close
                    .map(|c| format!("{} {}", u16::from(c.code), c.reason))
                    .unwrap_or_else(|| "closed by server".to_string());
                inner.transport_lost(generation, HotcoinError::ConnectionClosed { reason }, &cancel);
                break;
            }
            Some(Err(err)) => {
                inner.transport_lost(generation, HotcoinError::WebSocket(err), &cancel);
                break;
            }
            None => {
                let reason = "stream ended".to_string();
                inner.transport_lost(generation, HotcoinError::ConnectionClosed { reason }, &cancel);
                break;
            }
        }
    }
    tracing::debug!("Reader task stopped (generation {})", generation);
}

/// An authenticated, multiplexed stream connection.
///
/// One session owns one transport, one reader task, an optional heartbeat
/// task and one subscription registry. Cloning is cheap and every clone
/// drives the same session.
///
/// # Example
///
/// ```rust,no_run
/// use hotcoin_api_client::ws::{StreamSession, WsConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = StreamSession::new(WsConfig::default());
///     session.on_message(|frame| println!("{:?}: {:?}", frame.ch, frame.tick));
///     session.on_error(|err| eprintln!("stream error: {err}"));
///
///     session.connect().await?;
///     session.subscribe_ticker("btcusdt").await?;
///     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
///     session.disconnect().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct StreamSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("subscriptions", &self.inner.subscriptions.len())
            .field("has_credentials", &self.inner.credentials.is_some())
            .finish()
    }
}

impl StreamSession {
    /// Create a session for public topics only.
    pub fn new(config: WsConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a session that can authenticate for account topics.
    pub fn with_credentials(config: WsConfig, credentials: Arc<dyn CredentialsProvider>) -> Self {
        Self::build(config, Some(credentials))
    }

    fn build(config: WsConfig, credentials: Option<Arc<dyn CredentialsProvider>>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                credentials,
                transitions: Mutex::new(None),
                link: std::sync::Mutex::new(Link {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    sink: None,
                }),
                subscriptions: SubscriptionRegistry::new(),
                handlers: EventHandlers::default(),
                request_ids: RequestIds::new(),
            }),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &WsConfig {
        &self.inner.config
    }

    // Handler registration.

    pub fn on_connected(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.inner.handlers.set_connected(Arc::new(handler));
    }

    pub fn on_disconnected(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.inner.handlers.set_disconnected(Arc::new(handler));
    }

    pub fn on_error(&self, handler: impl Fn(&HotcoinError) + Send + Sync + 'static) {
        self.inner.handlers.set_error(Arc::new(handler));
    }

    pub fn on_message(&self, handler: impl Fn(StreamFrame) + Send + Sync + 'static) {
        self.inner.handlers.set_message(Arc::new(handler));
    }

    // State.

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == ConnectionState::Authenticated
    }

    /// Sorted snapshot of the active topics.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.subscriptions.snapshot()
    }

    // Lifecycle.

    /// Open the transport and start the reader (and heartbeat) tasks.
    ///
    /// Fails with [`HotcoinError::AlreadyConnected`] unless disconnected.
    /// The handshake is bounded by a 10 second timeout.
    pub async fn connect(&self) -> Result<(), HotcoinError> {
        let mut tasks = self.inner.transitions.lock().await;
        if self.state() != ConnectionState::Disconnected {
            return Err(HotcoinError::AlreadyConnected);
        }

        // Tasks left behind by a reader-side teardown.
        if let Some(stale) = tasks.take() {
            stale.shutdown().await;
        }

        self.inner.set_state(ConnectionState::Connecting);
        let url = self.inner.config.url.as_str();
        let ws_stream = match tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(url)).await {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(err)) => {
                self.inner.set_state(ConnectionState::Disconnected);
                return Err(HotcoinError::Connection(format!(
                    "Failed to connect to {url}: {err}"
                )));
            }
            Err(_) => {
                self.inner.set_state(ConnectionState::Disconnected);
                return Err(HotcoinError::Timeout);
            }
        };

        let (sink, receiver) = ws_stream.split();
        let generation = self.inner.attach(Arc::new(Mutex::new(sink)));
        tracing::info!("Connected to {}", url);

        let cancel = CancellationToken::new();
        let reader = tokio::spawn(run_reader(
            self.inner.clone(),
            receiver,
            generation,
            cancel.clone(),
        ));
        let heartbeat = self
            .inner
            .config
            .enable_heartbeat
            .then(|| self.spawn_heartbeat(cancel.clone()));

        *tasks = Some(ConnectionTasks {
            cancel,
            reader,
            heartbeat,
        });
        self.inner.handlers.emit_connected();
        Ok(())
    }

    fn spawn_heartbeat(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let inner = self.inner.clone();
        let period = inner.config.heartbeat_interval;
        tokio::spawn(async move {
            let sink = inner.clone();
            supervise_heartbeat(sink, period, cancel, |err| inner.handlers.emit_error(err)).await;
        })
    }

    /// Stop the tasks, close the transport and clear all subscriptions.
    ///
    /// No-op when already disconnected.
    pub async fn disconnect(&self) -> Result<(), HotcoinError> {
        let mut tasks = self.inner.transitions.lock().await;
        if let Some(running) = tasks.take() {
            running.shutdown().await;
        }

        let Some(detached) = self.inner.detach(None) else {
            return Ok(());
        };

        let closed = match detached.sink {
            Some(sink) => sink.lock().await.close().await,
            None => Ok(()),
        };
        tracing::info!("Disconnected from {}", self.inner.config.url);
        self.inner.handlers.emit_disconnected();

        match closed {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(HotcoinError::WebSocket(err)),
        }
    }

    /// Send a signed auth frame.
    ///
    /// Does not wait for the acknowledgment; the session turns
    /// [`ConnectionState::Authenticated`] once the server accepts it.
    pub async fn authenticate(&self) -> Result<(), HotcoinError> {
        let (state, generation) = self.inner.snapshot();
        if !state.is_connected() {
            return Err(HotcoinError::NotConnected);
        }
        let credentials = self
            .inner
            .credentials
            .as_ref()
            .map(|provider| provider.get_credentials())
            .filter(|creds| creds.is_complete())
            .ok_or(HotcoinError::MissingCredentials)?;

        let frame = self.inner.auth_frame(credentials)?;
        self.inner.send_frame_on(&frame, Some(generation)).await
    }

    // Subscriptions.

    /// Subscribe to a topic.
    ///
    /// Account topics additionally require an authenticated session.
    ///
    /// The frame only goes out on the connection the checks were made
    /// against; a reconnect in between yields `NotConnected`.
    pub async fn subscribe(&self, topic: &str) -> Result<(), HotcoinError> {
        let (state, generation) = self.inner.snapshot();
        if !state.is_connected() {
            return Err(HotcoinError::NotConnected);
        }
        if topics::is_private_topic(topic) && state != ConnectionState::Authenticated {
            return Err(HotcoinError::AuthenticationRequired);
        }

        self.inner.subscriptions.insert(topic)?;
        let frame = ControlFrame::subscribe(topic, self.inner.request_ids.next_id("sub"));
        if let Err(err) = self.inner.send_frame_on(&frame, Some(generation)).await {
            self.inner.subscriptions.remove(topic);
            return Err(err);
        }
        Ok(())
    }

    /// Unsubscribe from a topic. Unknown topics are not an error.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), HotcoinError> {
        if !self.is_connected() {
            return Err(HotcoinError::NotConnected);
        }

        self.inner.subscriptions.remove(topic);
        let frame = ControlFrame::unsubscribe(topic, self.inner.request_ids.next_id("unsub"));
        self.inner.send_frame(&frame).await
    }

    pub async fn subscribe_kline(&self, symbol: &str, period: &str) -> Result<(), HotcoinError> {
        self.subscribe(&topics::kline(symbol, period)).await
    }

    pub async fn subscribe_depth(&self, symbol: &str, depth_type: &str) -> Result<(), HotcoinError> {
        self.subscribe(&topics::depth(symbol, depth_type)).await
    }

    pub async fn subscribe_trade(&self, symbol: &str) -> Result<(), HotcoinError> {
        self.subscribe(&topics::trade(symbol)).await
    }

    pub async fn subscribe_ticker(&self, symbol: &str) -> Result<(), HotcoinError> {
        self.subscribe(&topics::ticker(symbol)).await
    }

    /// Order updates. Requires authentication.
    pub async fn subscribe_orders(&self, symbol: &str) -> Result<(), HotcoinError> {
        self.require_auth()?;
        self.subscribe(&topics::orders(symbol)).await
    }

    /// Position updates. Requires authentication.
    pub async fn subscribe_positions(&self, symbol: &str) -> Result<(), HotcoinError> {
        self.require_auth()?;
        self.subscribe(&topics::positions(symbol)).await
    }

    /// Account updates. Requires authentication.
    pub async fn subscribe_accounts(&self, symbol: &str) -> Result<(), HotcoinError> {
        self.require_auth()?;
        self.subscribe(&topics::accounts(symbol)).await
    }

    fn require_auth(&self) -> Result<(), HotcoinError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(HotcoinError::AuthenticationRequired)
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new(WsConfig::default())
    }
}
