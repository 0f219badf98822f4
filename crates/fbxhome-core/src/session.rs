// ── Session manager ──
//
// Owns the authenticated appliance session for the lifetime of an
// integration. Opens are serialized behind a mutex; the open session is
// shared as an `Arc<dyn Appliance>` cloned out of an `RwLock`, so passes
// and commands use it concurrently.
//
// Retry policy: nothing loops here. An authentication failure blocks
// further opens until `reauthorize()`. A transient failure arms a backoff
// deadline (1 s doubling to 30 s); callers (the next poll tick, a manual
// refresh) simply call `ensure_open()` again and fail fast until it passes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::appliance::{Appliance, Connector};
use crate::error::CoreError;

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Session state observable by hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Failed { reason: String },
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Internal retry bookkeeping, reset on every successful open.
#[derive(Debug, Default)]
struct RetryState {
    consecutive_failures: u32,
    not_before: Option<Instant>,
    auth_blocked: Option<String>,
}

impl RetryState {
    fn record_transient(&mut self) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let delay = backoff_delay(self.consecutive_failures);
        self.not_before = Some(Instant::now() + delay);
        delay
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Delay before the next open after `failures` consecutive failures.
fn backoff_delay(failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(5);
    BACKOFF_BASE.saturating_mul(1 << exp).min(BACKOFF_MAX)
}

pub struct SessionManager {
    connector: Arc<dyn Connector>,
    live: RwLock<Option<Arc<dyn Appliance>>>,
    retry: Mutex<RetryState>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(SessionState::Closed);
        Self {
            connector,
            live: RwLock::new(None),
            retry: Mutex::new(RetryState::default()),
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Return the live session, opening one if none exists or re-opening
    /// a failed one.
    ///
    /// Fails with `ConnectionError` on authentication failure (and on every
    /// call after, until [`reauthorize()`](Self::reauthorize)) and with
    /// `TransientIo` on network failure or while backing off.
    pub async fn ensure_open(&self) -> Result<Arc<dyn Appliance>, CoreError> {
        if let Some(session) = self.acquire().await {
            return Ok(session);
        }

        let mut retry = self.retry.lock().await;

        // Another caller may have opened while we waited for the lock.
        if let Some(session) = self.acquire().await {
            return Ok(session);
        }

        if let Some(reason) = &retry.auth_blocked {
            return Err(CoreError::ConnectionError {
                message: format!("{reason} (re-authorize the application on the appliance)"),
            });
        }
        if let Some(deadline) = retry.not_before {
            let now = Instant::now();
            if now < deadline {
                return Err(CoreError::TransientIo {
                    message: format!(
                        "backing off after {} failed attempts ({}ms left)",
                        retry.consecutive_failures,
                        (deadline - now).as_millis()
                    ),
                });
            }
        }

        if let Some(stale) = self.live.write().await.take() {
            debug!("discarding failed session");
            if let Err(e) = stale.close().await {
                debug!(error = %e, "closing failed session (ignored)");
            }
        }

        match self.connector.open().await {
            Ok(session) => {
                *self.live.write().await = Some(Arc::clone(&session));
                retry.reset();
                self.state.send_replace(SessionState::Open);
                info!("appliance session open");
                Ok(session)
            }
            Err(e) if e.is_auth_expired() || e.is_permission_denied() => {
                let reason = e.to_string();
                warn!(error = %e, "appliance rejected the application; not retrying");
                retry.auth_blocked = Some(reason.clone());
                self.state.send_replace(SessionState::Failed { reason });
                Err(e.into())
            }
            Err(e) => {
                let delay = retry.record_transient();
                warn!(error = %e, retry_in = ?delay, "failed to open appliance session");
                self.state.send_replace(SessionState::Failed {
                    reason: e.to_string(),
                });
                Err(CoreError::TransientIo {
                    message: e.to_string(),
                })
            }
        }
    }

    /// The live session if the state is Open. Never opens.
    pub async fn acquire(&self) -> Option<Arc<dyn Appliance>> {
        if !self.state.borrow().is_open() {
            return None;
        }
        self.live.read().await.clone()
    }

    /// Record an error seen while using the session. Session-level errors
    /// (expired token, appliance unreachable) move Open to Failed so the
    /// next `ensure_open()` re-opens; anything else is ignored here.
    pub fn report_failure(&self, err: &fbxhome_api::Error) {
        if err.is_auth_expired() || err.is_unreachable() {
            self.mark_failed(err.to_string());
        }
    }

    /// Move Open to Failed unconditionally.
    pub fn mark_failed(&self, reason: String) {
        let changed = self.state.send_if_modified(|state| {
            if state.is_open() {
                *state = SessionState::Failed {
                    reason: reason.clone(),
                };
                true
            } else {
                false
            }
        });
        if changed {
            warn!(reason = %reason, "appliance session failed");
        }
    }

    /// Clear a previous authentication block.
    pub async fn reauthorize(&self) {
        self.retry.lock().await.reset();
        info!("authorization block cleared");
    }

    /// Tear the session down. Idempotent; the final state is Closed.
    pub async fn close(&self) {
        let _retry = self.retry.lock().await;
        if let Some(session) = self.live.write().await.take() {
            if let Err(e) = session.close().await {
                warn!(error = %e, "logout failed (non-fatal)");
            }
            info!("appliance session closed");
        }
        self.state.send_replace(SessionState::Closed);
    }
}
