//! Client-initiated heartbeat.
//!
//! Server pings are answered inline by the reader (see the session's
//! dispatch path). This module drives the optional timer that sends
//! `{"ping": <unix millis>}` on a fixed interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::error::HotcoinError;
use crate::ws::frame::ControlFrame;

/// Anything that can put a control frame on the wire.
pub trait ControlSink: Send + Sync + 'static {
    fn send_control(
        &self,
        frame: &ControlFrame,
    ) -> impl Future<Output = Result<(), HotcoinError>> + Send;
}

/// Why the heartbeat loop stopped.
#[derive(Debug)]
pub enum HeartbeatExit {
    /// The session is shutting down.
    Cancelled,
    /// A ping could not be sent; the loop does not retry.
    SendFailed(HotcoinError),
}

/// Current unix time in milliseconds.
pub fn unix_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Send a ping every `period` until cancelled or a send fails.
///
/// The first ping goes out one full period after the call.
pub async fn run_heartbeat<S: ControlSink>(
    sink: Arc<S>,
    period: Duration,
    cancel: CancellationToken,
) -> HeartbeatExit {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return HeartbeatExit::Cancelled,
            _ = ticker.tick() => {
                let frame = ControlFrame::ping(unix_millis());
                if let Err(err) = sink.send_control(&frame).await {
                    return HeartbeatExit::SendFailed(err);
                }
                tracing::trace!("Heartbeat ping sent");
            }
        }
    }
}

/// Run the heartbeat and hand a send failure to `on_error`.
///
/// Failures seen after `cancel` fired belong to shutdown and are only logged.
pub async fn supervise_heartbeat<S, F>(
    sink: Arc<S>,
    period: Duration,
    cancel: CancellationToken,
    on_error: F,
) where
    S: ControlSink,
    F: Fn(&HotcoinError),
{
    if let HeartbeatExit::SendFailed(err) = run_heartbeat(sink, period, cancel.clone()).await {
        if cancel.is_cancelled() {
            tracing::debug!("Heartbeat send failed during shutdown: {}", err);
        } else {
            tracing::warn!("Heartbeat stopped: {}", err);
            on_error(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        frames: Mutex<Vec<ControlFrame>>,
        fail_after: Option<usize>,
        attempts: AtomicUsize,
        /// Fired just before a failing send, as a shutdown would.
        cancel_on_failure: Option<CancellationToken>,
    }

    impl ControlSink for RecordingSink {
        fn send_control(
            &self,
            frame: &ControlFrame,
        ) -> impl Future<Output = Result<(), HotcoinError>> + Send {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            let result = match self.fail_after {
                Some(limit) if attempt >= limit => {
                    if let Some(cancel) = &self.cancel_on_failure {
                        cancel.cancel();
                    }
                    Err(HotcoinError::NotConnected)
                }
                _ => {
                    self.frames.lock().unwrap().push(frame.clone());
                    Ok(())
                }
            };
            async move { result }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pings_on_interval() {
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_heartbeat(
            sink.clone(),
            Duration::from_secs(20),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(19)).await;
        assert!(sink.frames.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(42)).await;
        assert_eq!(sink.frames.lock().unwrap().len(), 3);
        assert!(
            sink.frames
                .lock()
                .unwrap()
                .iter()
                .all(|f| matches!(f, ControlFrame::Ping { ping } if *ping > 0))
        );

        cancel.cancel();
        assert!(matches!(handle.await.unwrap(), HeartbeatExit::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_send_failure() {
        let sink = Arc::new(RecordingSink {
            fail_after: Some(1),
            ..Default::default()
        });

        let exit = run_heartbeat(
            sink.clone(),
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .await;

        assert!(matches!(exit, HeartbeatExit::SendFailed(HotcoinError::NotConnected)));
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(sink.frames.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_first_tick() {
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exit = run_heartbeat(sink.clone(), Duration::from_secs(3600), cancel).await;
        assert!(matches!(exit, HeartbeatExit::Cancelled));
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervised_failure_reported_once() {
        let sink = Arc::new(RecordingSink {
            fail_after: Some(0),
            ..Default::default()
        });
        let reported = Mutex::new(Vec::new());

        supervise_heartbeat(
            sink.clone(),
            Duration::from_millis(10),
            CancellationToken::new(),
            |err| reported.lock().unwrap().push(err.to_string()),
        )
        .await;

        assert_eq!(reported.lock().unwrap().len(), 1);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervised_failure_after_cancel_is_silent() {
        let cancel = CancellationToken::new();
        let sink = Arc::new(RecordingSink {
            fail_after: Some(0),
            cancel_on_failure: Some(cancel.clone()),
            ..Default::default()
        });
        let reported = AtomicUsize::new(0);

        supervise_heartbeat(sink.clone(), Duration::from_millis(10), cancel, |_| {
            reported.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(reported.load(Ordering::SeqCst), 0);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    }
}
