//! Handler registration and frame routing.
//!
//! [`classify`] decides what a decoded frame is for, in a fixed priority
//! order; the session then carries out the resulting [`FrameAction`].

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::HotcoinError;
use crate::ws::frame::StreamFrame;

/// Called on connect and disconnect.
pub type ConnectionHandler = Arc<dyn Fn() + Send + Sync>;
/// Called for every asynchronous failure.
pub type ErrorHandler = Arc<dyn Fn(&HotcoinError) + Send + Sync>;
/// Called for every data frame.
pub type MessageHandler = Arc<dyn Fn(StreamFrame) + Send + Sync>;

/// What to do with a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    /// Server ping: answer with this value.
    Pong(i64),
    /// Auth ack with zero error code.
    AuthAccepted,
    /// Auth ack with a non-zero error code.
    AuthRejected(String),
    /// Subscribe ack for a topic.
    Subscribed(String),
    /// Unsubscribe ack for a topic.
    Unsubscribed(String),
    /// Hand the frame to the message handler.
    Deliver,
}

/// Route a frame. First match wins:
///
/// 1. positive `ping`
/// 2. `op == "auth"`
/// 3. non-empty `subbed`
/// 4. non-empty `unsubbed`
/// 5. everything else is delivered
pub fn classify(frame: &StreamFrame) -> FrameAction {
    if let Some(ping) = frame.ping.filter(|p| *p > 0) {
        return FrameAction::Pong(ping);
    }

    if frame.op.as_deref() == Some("auth") {
        return match frame.err_code.unwrap_or(0) {
            0 => FrameAction::AuthAccepted,
            code => FrameAction::AuthRejected(
                frame
                    .err_msg
                    .clone()
                    .filter(|msg| !msg.is_empty())
                    .unwrap_or_else(|| format!("error code {code}")),
            ),
        };
    }

    if let Some(topic) = frame.subbed.as_ref().filter(|t| !t.is_empty()) {
        return FrameAction::Subscribed(topic.clone());
    }

    if let Some(topic) = frame.unsubbed.as_ref().filter(|t| !t.is_empty()) {
        return FrameAction::Unsubscribed(topic.clone());
    }

    FrameAction::Deliver
}

/// Registered session callbacks.
///
/// Handlers are cloned out of their slot before being invoked, so a
/// handler may register other handlers or call back into the session.
#[derive(Default)]
pub struct EventHandlers {
    connected: RwLock<Option<ConnectionHandler>>,
    disconnected: RwLock<Option<ConnectionHandler>>,
    error: RwLock<Option<ErrorHandler>>,
    message: RwLock<Option<MessageHandler>>,
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("connected", &load(&self.connected).is_some())
            .field("disconnected", &load(&self.disconnected).is_some())
            .field("error", &load(&self.error).is_some())
            .field("message", &load(&self.message).is_some())
            .finish()
    }
}

fn load<T: Clone>(slot: &RwLock<Option<T>>) -> Option<T> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn store<T>(slot: &RwLock<Option<T>>, value: T) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
}

impl EventHandlers {
    pub fn set_connected(&self, handler: ConnectionHandler) {
        store(&self.connected, handler);
    }

    pub fn set_disconnected(&self, handler: ConnectionHandler) {
        store(&self.disconnected, handler);
    }

    pub fn set_error(&self, handler: ErrorHandler) {
        store(&self.error, handler);
    }

    pub fn set_message(&self, handler: MessageHandler) {
        store(&self.message, handler);
    }

    pub fn emit_connected(&self) {
        if let Some(handler) = load(&self.connected) {
            handler();
        }
    }

    pub fn emit_disconnected(&self) {
        if let Some(handler) = load(&self.disconnected) {
            handler();
        }
    }

    pub fn emit_error(&self, err: &HotcoinError) {
        match load(&self.error) {
            Some(handler) => handler(err),
            None => tracing::warn!("Unhandled stream error: {}", err),
        }
    }

    pub fn emit_message(&self, frame: StreamFrame) {
        if let Some(handler) = load(&self.message) {
            handler(frame);
        }
    }
}
