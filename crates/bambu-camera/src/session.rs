//! Single-frame capture session.
//!
//! A session connects, streams bytes into a [`FrameDecoder`] and reconnects
//! per its [`ReconnectPolicy`] until it has a frame, the overall timeout
//! fires, or it is stopped. Every path ends in [`SessionState`] being moved
//! to a terminal state by one compare-and-set, so the outcome is produced at
//! most once.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::CameraConfig;
use crate::decoder::FrameDecoder;
use crate::error::{CaptureError, Result};
use crate::reconnect::ReconnectPolicy;
use crate::transport::{Connection, Connector, TransportEvent};

/// Outcome of a capture: the JPEG bytes or the reason there are none.
pub type CaptureResult = Result<Vec<u8>>;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not started.
    Idle,
    /// Opening a connection.
    Connecting,
    /// Connected, decoding ingress bytes.
    Streaming,
    /// Settled with a frame.
    Resolved,
    /// Settled with an error.
    Failed,
    /// Stopped by the caller before settling.
    Stopped,
}

impl SessionState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Resolved | SessionState::Failed | SessionState::Stopped
        )
    }
}

struct Shared {
    state: watch::Sender<SessionState>,
    outcome: Mutex<Option<CaptureResult>>,
    attempts: AtomicU32,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            state,
            outcome: Mutex::new(None),
            attempts: AtomicU32::new(0),
        }
    }

    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Move to a non-terminal state unless the session already ended.
    fn advance(&self, next: SessionState) -> bool {
        debug_assert!(!next.is_terminal());
        self.state.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                return false;
            }
            *state = next;
            true
        }) || self.state() == next
    }

    /// Record the outcome. Only the first call on a live session has effect.
    fn settle(&self, result: CaptureResult) -> bool {
        let terminal = if result.is_ok() {
            SessionState::Resolved
        } else {
            SessionState::Failed
        };
        let won = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = terminal;
            true
        });
        if won {
            match &result {
                Ok(frame) => info!(bytes = frame.len(), "capture resolved"),
                Err(e) => warn!(kind = %e.kind(), "capture failed: {}", e),
            }
            *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        } else {
            debug!("ignoring settlement of finished session");
        }
        won
    }

    fn stop(&self) -> bool {
        let stopped = self.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = SessionState::Stopped;
            true
        });
        if stopped {
            info!("capture stopped");
        }
        stopped
    }

    fn take_outcome(&self) -> Option<CaptureResult> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Handle for observing or stopping a running session from elsewhere.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    /// Stop the session if it has not settled yet.
    ///
    /// Returns `false` when the session had already ended; nothing changes
    /// in that case.
    pub fn stop(&self) -> bool {
        self.shared.stop()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Connection attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

/// One capture operation against one printer.
pub struct CaptureSession<C> {
    config: CameraConfig,
    connector: C,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
}

impl<C: Connector> CaptureSession<C> {
    /// Create an idle session with the default reconnect policy.
    pub fn new(config: CameraConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            policy: ReconnectPolicy::default(),
            shared: Arc::new(Shared::new()),
        }
    }

    /// Replace the reconnect policy.
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Handle that can stop this session while [`run`](Self::run) is pending.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run the session to completion.
    ///
    /// Returns `None` if the session was stopped before it settled.
    /// Connections and timers are released before the outcome is recorded.
    pub async fn run(self) -> Option<CaptureResult> {
        let CaptureSession {
            config,
            connector,
            policy,
            shared,
        } = self;

        if let Err(e) = config.validate() {
            shared.settle(Err(e));
            return shared.take_outcome();
        }
        if !shared.advance(SessionState::Connecting) {
            return shared.take_outcome();
        }

        info!(
            host = %config.host,
            port = config.port,
            timeout_ms = config.timeout_ms(),
            "starting camera capture"
        );

        let outcome = tokio::select! {
            biased;
            _ = stopped(shared.state.subscribe()) => None,
            _ = tokio::time::sleep(config.timeout) => {
                Some(Err(CaptureError::OperationTimeout(config.timeout_ms())))
            }
            result = drive(&config, &connector, &policy, &shared) => Some(result),
        };

        if let Some(result) = outcome {
            shared.settle(result);
        }
        shared.take_outcome()
    }
}

/// Resolves once the session is moved to [`SessionState::Stopped`].
async fn stopped(mut state: watch::Receiver<SessionState>) {
    loop {
        if *state.borrow_and_update() == SessionState::Stopped {
            return;
        }
        if state.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

enum StreamEnd {
    Frame(Vec<u8>),
    Closed,
    Errored(std::io::Error),
}

/// Connect, stream and reconnect until a frame arrives or retries run out.
async fn drive<C: Connector>(
    config: &CameraConfig,
    connector: &C,
    policy: &ReconnectPolicy,
    shared: &Shared,
) -> CaptureResult {
    let mut decoder = FrameDecoder::new();

    loop {
        let attempt = shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        shared.advance(SessionState::Connecting);
        debug!(attempt, "connecting to camera at {}", config.addr());

        let reason = match connector.connect(config).await {
            Ok(mut conn) => {
                shared.advance(SessionState::Streaming);
                decoder.reset();
                let end = stream_frames(&mut conn, &mut decoder).await;
                conn.destroy();
                match end {
                    StreamEnd::Frame(frame) => return Ok(frame),
                    StreamEnd::Closed => "stream closed by printer".to_string(),
                    StreamEnd::Errored(e) => format!("stream error: {}", e),
                }
            }
            Err(e) if e.is_retryable() => e.to_string(),
            Err(e) => return Err(CaptureError::ConnectFailed(e.to_string())),
        };

        let decision = policy.decide(attempt);
        if !decision.retry {
            return Err(CaptureError::ConnectExhausted {
                attempts: attempt,
                last_error: reason,
            });
        }
        warn!(
            attempt,
            delay_ms = decision.delay.as_millis() as u64,
            "camera connection lost ({}), reconnecting",
            reason
        );
        tokio::time::sleep(decision.delay).await;
    }
}

async fn stream_frames(conn: &mut Connection, decoder: &mut FrameDecoder) -> StreamEnd {
    loop {
        match conn.next_event().await {
            TransportEvent::Data(bytes) => {
                if let Some(frame) = decoder.feed(bytes) {
                    return StreamEnd::Frame(frame);
                }
            }
            TransportEvent::Closed => return StreamEnd::Closed,
            TransportEvent::Errored(e) => return StreamEnd::Errored(e),
        }
    }
}
