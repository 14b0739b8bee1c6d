//! Avatar request/response over a persistent WebSocket

use crate::error::{ChannelError, Result};
use avatar_protocol::{AvatarRequest, AvatarResponse};
use futures_util::{Sink, SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const DEFAULT_SERVER: &str = "ws://127.0.0.1:3000/ws";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(500);
const OUTBOUND_BUFFER: usize = 64;

/// Configuration for the avatar channel
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Game server WebSocket URL
    pub url: String,
    /// How long to wait for a response before giving up on a request
    pub request_timeout: Duration,
    /// Connection attempts before a request fails
    pub max_reconnect_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

type PendingMap = Mutex<HashMap<u64, oneshot::Sender<AvatarResponse>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<AvatarResponse>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One live socket with its reader and writer tasks
struct Connection {
    outbound: mpsc::Sender<String>,
    pending: Arc<PendingMap>,
    closed: Arc<AtomicBool>,
}

impl Connection {
    async fn open(url: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(url).await?;
        let (write, mut read) = ws_stream.split();

        let (outbound, outbound_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
        let pending: Arc<PendingMap> = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(write_frames(
            write,
            outbound_rx,
            pending.clone(),
            closed.clone(),
        ));

        let reader_pending = pending.clone();
        let reader_closed = closed.clone();
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => dispatch(&reader_pending, &text),
                    Ok(Message::Close(_)) => {
                        info!("Avatar channel received close frame");
                        break;
                    }
                    Ok(_) => {
                        // Ignore binary, ping, pong messages
                    }
                    Err(e) => {
                        error!(error = %e, "Avatar channel WebSocket error");
                        break;
                    }
                }
            }

            fail_pending(&reader_closed, &reader_pending);
        });

        info!(url, "Avatar channel connected");
        Ok(Self {
            outbound,
            pending,
            closed,
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn forget(&self, request_id: u64) {
        lock(&self.pending).remove(&request_id);
    }
}

/// Forward queued frames to the socket until the queue or the socket closes
async fn write_frames<S>(
    mut write: S,
    mut outbound_rx: mpsc::Receiver<String>,
    pending: Arc<PendingMap>,
    closed: Arc<AtomicBool>,
) where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = write.send(Message::text(frame)).await {
            error!(error = %e, "Failed to send avatar request");
            break;
        }
    }
    fail_pending(&closed, &pending);
    let _ = write.close().await;
}

/// Mark the connection closed and drop every waiter, so pending requests
/// fail with `ConnectionClosed` right away
fn fail_pending(closed: &AtomicBool, pending: &PendingMap) {
    // Mark closed before failing waiters so late registrations notice
    closed.store(true, Ordering::SeqCst);
    let abandoned = {
        let mut pending = lock(pending);
        let count = pending.len();
        pending.clear();
        count
    };
    if abandoned > 0 {
        warn!(abandoned, "Avatar channel closed with requests pending");
    }
}

/// Route a server frame to the request waiting for it
fn dispatch(pending: &PendingMap, text: &str) {
    let response: AvatarResponse = match serde_json::from_str(text) {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "Ignoring non-avatar frame");
            return;
        }
    };

    let Some(request_id) = response.request_id else {
        debug!("Ignoring avatar response without requestId");
        return;
    };

    match lock(pending).remove(&request_id) {
        Some(waiter) => {
            let _ = waiter.send(response);
        }
        None => debug!(request_id, "No pending request for avatar response"),
    }
}

/// Avatar client over a lazily (re)connected WebSocket
pub struct AvatarChannel {
    config: ChannelConfig,
    connection: tokio::sync::Mutex<Option<Arc<Connection>>>,
    next_request_id: AtomicU64,
}

impl AvatarChannel {
    /// Create a channel that connects on first use
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            connection: tokio::sync::Mutex::new(None),
            next_request_id: AtomicU64::new(0),
        }
    }

    /// Create a channel and connect immediately
    pub async fn connect(config: ChannelConfig) -> Result<Self> {
        let channel = Self::new(config);
        channel.connection().await?;
        Ok(channel)
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub async fn is_connected(&self) -> bool {
        match self.connection.lock().await.as_ref() {
            Some(conn) => !conn.is_closed(),
            None => false,
        }
    }

    async fn connection(&self) -> Result<Arc<Connection>> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            if !conn.is_closed() {
                return Ok(conn.clone());
            }
            debug!("Avatar channel connection lost, reconnecting");
        }

        let conn = Arc::new(self.open_with_retry().await?);
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn open_with_retry(&self) -> Result<Connection> {
        let max_attempts = self.config.max_reconnect_attempts.max(1);
        let mut attempts = 0;

        loop {
            match Connection::open(&self.config.url).await {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    attempts += 1;
                    error!(url = %self.config.url, error = %e, "Avatar channel connect failed");
                    if attempts >= max_attempts {
                        return Err(ChannelError::MaxReconnectAttempts);
                    }

                    let delay = INITIAL_RECONNECT_DELAY * 2u32.pow(attempts - 1);
                    warn!(
                        "Reconnecting in {:?} (attempt {}/{})",
                        delay, attempts, max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Send one `getAvatar` request and wait for its response
    pub async fn fetch_avatar(&self, avatar_id: &str) -> Result<AvatarResponse> {
        let conn = self.connection().await?;
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;

        let (tx, rx) = oneshot::channel();
        lock(&conn.pending).insert(request_id, tx);
        if conn.is_closed() {
            conn.forget(request_id);
            return Err(ChannelError::ConnectionClosed);
        }

        let frame = serde_json::to_string(&AvatarRequest::get_avatar(request_id, avatar_id))?;
        if conn.outbound.send(frame).await.is_err() {
            conn.forget(request_id);
            return Err(ChannelError::ConnectionClosed);
        }
        debug!(request_id, avatar_id, "Sent avatar request");

        match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ChannelError::ConnectionClosed),
            Err(_) => {
                conn.forget(request_id);
                warn!(request_id, avatar_id, "Avatar request timed out");
                Err(ChannelError::Timeout(self.config.request_timeout))
            }
        }
    }
}
