//! Session transport: one WebSocket session to the controller that
//! reconnects after a fixed delay.
//!
//! # State machine
//!
//! ```text
//!             connect()               handshake ok
//!  Closed ───────────────▶ Connecting ─────────────▶ Open
//!    ▲                         │                      │
//!    │   handshake failed      │     read/write error │
//!    └─────────────────────────┴──────────────────────┘
//!                 on_close(): schedule reconnect
//! ```
//!
//! # Reconnect scheduling
//!
//! A connection attempt lives in a field of the transport, not in the
//! future returned by [`SessionTransport::next_event`].  Dropping that
//! future mid-handshake (e.g. because a UI event won a `select!`) leaves the
//! attempt running; the next call resumes it.  At most one attempt is ever
//! in flight.
//!
//! Every close (re)schedules the single reconnect timer for
//! `now + reconnect_delay`.  Scheduling *replaces* the previous deadline, so
//! two closes 500 ms apart still produce exactly one connection attempt,
//! `reconnect_delay` after the second close.  There is no backoff and no
//! retry cap: the transport keeps trying for as long as it is polled.
//!
//! # Outbound frames
//!
//! Frames are only accepted while the session is open.  Anything sent while
//! connecting or closed is dropped (with a debug log); the caller never
//! sees an error for it.
//!
//! # Seams
//!
//! The socket itself sits behind two small traits, [`Connector`] and
//! [`Link`], so the state machine can be driven in tests with an in-memory
//! link and tokio's paused clock.  [`websocket::WsConnector`] is the real
//! implementation.

pub mod websocket;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Errors produced by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The page URL uses a scheme that has no WebSocket counterpart.
    #[error("unsupported URL scheme {0:?} (expected http, https, ws or wss)")]
    UnsupportedScheme(String),

    /// The page URL has no host to connect to.
    #[error("URL {0} has no host")]
    MissingHost(Url),

    /// The WebSocket handshake or an established connection failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The peer closed the connection.
    #[error("connection closed by controller")]
    Closed,
}

/// Where the session currently is.  See the module docs for transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Events surfaced to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed; frames can be sent.
    Opened,
    /// The connection closed or failed.  A reconnect is already scheduled.
    Closed,
    /// One inbound text frame.
    MessageReceived(String),
}

// ── Seams ─────────────────────────────────────────────────────────────────────

/// An established bidirectional text channel.
#[async_trait]
pub trait Link: Send {
    /// Writes one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits for the next text frame.
    ///
    /// Returns `None` once the peer has closed the connection cleanly.
    async fn recv_text(&mut self) -> Option<Result<String, TransportError>>;
}

/// Opens a [`Link`] to a WebSocket URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Link>, TransportError>;
}

// ── URL mapping ───────────────────────────────────────────────────────────────

/// Maps the page URL the client was opened with onto the controller's
/// WebSocket URL.
///
/// `https`/`wss` map to `wss`, `http`/`ws` map to `ws`.  Host, port and
/// path are kept; query and fragment are dropped (the fragment carries the
/// user's key material and must never leave the client).
///
/// # Errors
///
/// Returns [`TransportError::UnsupportedScheme`] for any other scheme and
/// [`TransportError::MissingHost`] if the URL has no host.
pub fn page_url_to_ws(page: &Url) -> Result<Url, TransportError> {
    let scheme = match page.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(TransportError::UnsupportedScheme(other.to_string())),
    };
    if page.host_str().is_none() {
        return Err(TransportError::MissingHost(page.clone()));
    }

    let mut ws = page.clone();
    ws.set_query(None);
    ws.set_fragment(None);
    ws.set_scheme(scheme)
        .map_err(|()| TransportError::UnsupportedScheme(page.scheme().to_string()))?;
    Ok(ws)
}

// ── SessionTransport ──────────────────────────────────────────────────────────

/// An in-flight handshake, owned by the transport so it survives
/// cancellation of [`SessionTransport::next_event`].
type Handshake = Pin<Box<dyn Future<Output = Result<Box<dyn Link>, TransportError>> + Send>>;

/// Reconnecting session over a [`Connector`].
///
/// Drive it by awaiting [`next_event`](Self::next_event) in a loop; queue
/// frames with [`send`](Self::send) and write them with
/// [`flush`](Self::flush).
pub struct SessionTransport<C: Connector> {
    connector: Arc<C>,
    url: Url,
    reconnect_delay: Duration,
    state: ConnectionState,
    link: Option<Box<dyn Link>>,
    handshake: Option<Handshake>,
    reconnect_at: Option<Instant>,
    outbox: VecDeque<String>,
    connect_attempts: u64,
}

impl<C: Connector> SessionTransport<C> {
    /// Creates a transport in the `Closed` state.  The first call to
    /// [`next_event`](Self::next_event) connects immediately.
    pub fn new(connector: C, url: Url, reconnect_delay: Duration) -> Self {
        Self {
            connector: Arc::new(connector),
            url,
            reconnect_delay,
            state: ConnectionState::Closed,
            link: None,
            handshake: None,
            reconnect_at: None,
            outbox: VecDeque::new(),
            connect_attempts: 0,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Deadline of the scheduled reconnect, if any.
    pub fn pending_reconnect(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Number of connection attempts made so far.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts
    }

    /// Queues a text frame for the open session.
    ///
    /// Frames offered while the session is not open are dropped.
    pub fn send(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.state != ConnectionState::Open {
            debug!("not connected; dropping outbound frame {text}");
            return;
        }
        self.outbox.push_back(text);
    }

    /// Writes every queued frame, in order.
    ///
    /// Returns `Some(TransportEvent::Closed)` if a write failed; the
    /// connection is then torn down and the remaining frames discarded.
    pub async fn flush(&mut self) -> Option<TransportEvent> {
        while let Some(text) = self.outbox.pop_front() {
            let Some(link) = self.link.as_mut() else {
                self.outbox.clear();
                return None;
            };
            debug!("client → controller: {text}");
            if let Err(e) = link.send_text(text).await {
                warn!("write to controller failed: {e}");
                return Some(self.on_close());
            }
        }
        None
    }

    /// Waits for the next transport event.
    ///
    /// While open this reads the next inbound frame.  While closed it sleeps
    /// until the scheduled reconnect (if any) and then attempts to connect.
    ///
    /// Cancel-safe: dropping the future during the sleep leaves the deadline
    /// in place, and dropping it during the handshake leaves the attempt
    /// running for the next call to resume.
    pub async fn next_event(&mut self) -> TransportEvent {
        if let Some(link) = self.link.as_mut() {
            return match link.recv_text().await {
                Some(Ok(text)) => TransportEvent::MessageReceived(text),
                Some(Err(e)) => {
                    warn!("connection to controller failed: {e}");
                    self.on_close()
                }
                None => {
                    info!("controller closed the connection");
                    self.on_close()
                }
            };
        }

        if self.handshake.is_none() {
            if let Some(deadline) = self.reconnect_at {
                time::sleep_until(deadline).await;
            }
            self.start_handshake();
        }
        self.finish_handshake().await
    }

    /// Tears the connection down and (re)schedules the reconnect timer.
    ///
    /// Calling this repeatedly only ever leaves one timer armed, set
    /// `reconnect_delay` after the latest call.
    pub fn on_close(&mut self) -> TransportEvent {
        self.link = None;
        self.handshake = None;
        self.outbox.clear();
        self.state = ConnectionState::Closed;
        self.schedule_reconnect();
        TransportEvent::Closed
    }

    fn schedule_reconnect(&mut self) {
        let deadline = Instant::now() + self.reconnect_delay;
        if self.reconnect_at.replace(deadline).is_some() {
            debug!("reconnect rescheduled");
        }
        info!("reconnecting in {} ms", self.reconnect_delay.as_millis());
    }

    fn start_handshake(&mut self) {
        self.reconnect_at = None;
        self.state = ConnectionState::Connecting;
        self.connect_attempts += 1;
        debug!("connecting to {} (attempt {})", self.url, self.connect_attempts);

        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        self.handshake = Some(Box::pin(async move { connector.connect(&url).await }));
    }

    async fn finish_handshake(&mut self) -> TransportEvent {
        let result = match self.handshake.as_mut() {
            Some(handshake) => handshake.await,
            None => Err(TransportError::Closed),
        };
        self.handshake = None;

        match result {
            Ok(link) => {
                info!("connected to {}", self.url);
                self.link = Some(link);
                self.state = ConnectionState::Open;
                TransportEvent::Opened
            }
            Err(e) => {
                warn!("failed to connect to {}: {e}", self.url);
                self.on_close()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
