/// Realtime connection with automatic reconnection
///
/// # Connection lifecycle
///
/// 1. Connect to `/ws?token=...`.
/// 2. Send `user:joined` with the logged-in user ID, once per connection.
/// 3. Invalidate the task list, since events sent while disconnected are lost.
/// 4. Feed every frame to the [`Reconciler`] until the connection drops.
///
/// Refetches run on a separate refresher task for the lifetime of
/// [`RealtimeClient::run`], so reading frames never waits on HTTP.
/// 5. Wait with exponential backoff and go back to 1.
///
/// After [`ReconnectPolicy::max_attempts`] consecutive failed attempts the
/// client gives up with [`ClientError::ReconnectExhausted`]. A successful
/// connection resets the count. Cancelling the shutdown token stops the
/// client at any point.

use std::sync::Arc;
use std::time::Duration;

use collabtask_shared::events::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use rand::Rng;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::reconciler::Reconciler;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Backoff between reconnection attempts
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first attempt
    pub initial_delay: Duration,

    /// Upper bound for any delay, jitter included
    pub max_delay: Duration,

    /// Consecutive failed attempts before giving up
    pub max_attempts: u32,

    /// Random spread applied to each delay, as a fraction of it (0.0..=1.0)
    pub jitter: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_attempts: 5,
            jitter: 0.5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (starting at 1)
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        let base = self
            .initial_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay);

        let jitter = self.jitter.clamp(0.0, 1.0);
        let factor = if jitter > 0.0 {
            1.0 + rng.gen_range(-jitter..=jitter)
        } else {
            1.0
        };

        base.mul_f64(factor).min(self.max_delay)
    }
}

/// How a connected session ended
enum SessionEnd {
    Shutdown,
    Closed,
}

pub struct RealtimeClient {
    url: String,
    user_id: Uuid,
    reconciler: Arc<Reconciler>,
    policy: ReconnectPolicy,
    shutdown: CancellationToken,
}

impl RealtimeClient {
    /// # Arguments
    ///
    /// * `url` - Full WebSocket URL, token included
    /// * `user_id` - Room to join on every connection
    /// * `reconciler` - Receives every decoded event
    pub fn new(url: impl Into<String>, user_id: Uuid, reconciler: Arc<Reconciler>) -> Self {
        Self {
            url: url.into(),
            user_id,
            reconciler,
            policy: ReconnectPolicy::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Token that stops [`RealtimeClient::run`] when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Connects and keeps reconnecting until shut down or out of attempts
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ReconnectExhausted`] once the attempts run
    /// out.
    pub async fn run(&self) -> ClientResult<()> {
        let refresher_stop = self.shutdown.child_token();
        let _stop_refresher = refresher_stop.clone().drop_guard();
        tokio::spawn({
            let reconciler = Arc::clone(&self.reconciler);
            async move { reconciler.run_refresher(refresher_stop).await }
        });

        self.reconnect().await
    }

    async fn reconnect(&self) -> ClientResult<()> {
        let mut attempts = 0;

        loop {
            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                result = connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((socket, _)) => {
                    attempts = 0;
                    info!(user_id = %self.user_id, "Realtime connection established");

                    match self.session(socket).await {
                        Ok(SessionEnd::Shutdown) => return Ok(()),
                        Ok(SessionEnd::Closed) => info!("Realtime connection closed by server"),
                        Err(e) => warn!(error = %e, "Realtime connection lost"),
                    }
                }
                Err(e) => {
                    warn!(attempt = attempts, error = %e, "Realtime connection failed");
                }
            }

            if attempts >= self.policy.max_attempts {
                return Err(ClientError::ReconnectExhausted { attempts });
            }
            attempts += 1;

            let delay = self.policy.delay(attempts, &mut rand::thread_rng());
            debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn session(&self, socket: WsStream) -> ClientResult<SessionEnd> {
        let (mut sink, mut stream) = socket.split();

        let join = ClientEvent::UserJoined(self.user_id).encode()?;
        sink.send(Message::Text(join)).await?;
        debug!(user_id = %self.user_id, "Sent user:joined");

        self.reconciler.on_connected().await;

        loop {
            let incoming = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
                incoming = stream.next() => incoming,
            };

            match incoming {
                Some(Ok(Message::Text(text))) => match ServerEvent::decode(&text) {
                    Ok(event) => self.reconciler.handle_event(&event).await,
                    Err(e) => warn!(error = %e, "Ignoring malformed frame"),
                },
                Some(Ok(Message::Ping(payload))) => sink.send(Message::Pong(payload)).await?,
                Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_delay_doubles_up_to_cap_without_jitter() {
        let policy = ReconnectPolicy {
            jitter: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        let delays: Vec<u64> = (1..=5)
            .map(|attempt| policy.delay(attempt, &mut rng).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 5_000, 5_000]);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = ReconnectPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);

        for attempt in 1..=10 {
            for _ in 0..100 {
                let delay = policy.delay(attempt, &mut rng);
                assert!(delay <= policy.max_delay);
                if attempt == 1 {
                    assert!(delay >= Duration::from_millis(500));
                    assert!(delay <= Duration::from_millis(1_500));
                }
            }
        }
    }

    #[test]
    fn test_huge_attempt_numbers_do_not_overflow() {
        let policy = ReconnectPolicy::default();
        let delay = policy.delay(u32::MAX, &mut StdRng::seed_from_u64(1));
        assert!(delay <= policy.max_delay);
    }
}
