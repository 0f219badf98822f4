// ── Command dispatcher ──
//
// Executes validated commands against the appliance. Commands never open
// or re-open the session: they use it if it is open and fail fast if not.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::appliance::RemoteKeySender;
use crate::command::CommandRequest;
use crate::error::DispatchError;
use crate::session::SessionManager;

pub struct CommandDispatcher {
    session: Arc<SessionManager>,
    remote: Option<Arc<dyn RemoteKeySender>>,
}

impl CommandDispatcher {
    pub fn new(session: Arc<SessionManager>, remote: Option<Arc<dyn RemoteKeySender>>) -> Self {
        Self { session, remote }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Send a remote-control key `request.presses()` times in sequence.
    ///
    /// Presses are independent: a failed press does not stop the ones
    /// after it. If any failed, the error lists their 1-based indices.
    pub async fn send(&self, request: CommandRequest) -> Result<(), DispatchError> {
        let remote = self.remote.as_ref().ok_or(DispatchError::NotConfigured)?;
        if self.session.acquire().await.is_none() {
            return Err(DispatchError::Unavailable);
        }

        let key = request.code().key();
        let attempted = request.presses();
        let mut failed = Vec::new();
        let mut last_error = None;
        for press in 1..=attempted {
            match remote.send_key(key, request.long_press()).await {
                Ok(()) => debug!(key, press, "key press sent"),
                Err(e) => {
                    warn!(key, press, error = %e, "key press failed");
                    failed.push(press);
                    last_error = Some(e.to_string());
                }
            }
        }

        match last_error {
            None => {
                info!(key, presses = attempted, long_press = request.long_press(), "remote command sent");
                Ok(())
            }
            Some(message) => Err(DispatchError::Delivery {
                attempted,
                failed,
                message,
            }),
        }
    }

    /// Reboot the appliance. A failure is fatal to this invocation and is
    /// never retried.
    pub async fn reboot(&self) -> Result<(), DispatchError> {
        let appliance = self
            .session
            .acquire()
            .await
            .ok_or(DispatchError::Unavailable)?;
        info!("rebooting appliance");
        appliance.reboot().await.map_err(|e| {
            self.session.report_failure(&e);
            DispatchError::FatalPrivilegedOp {
                message: e.to_string(),
            }
        })
    }

    /// Switch every Wi-Fi radio on or off. Returns the state the appliance
    /// reports afterwards. Not retried.
    pub async fn set_wifi(&self, enabled: bool) -> Result<bool, DispatchError> {
        let appliance = self
            .session
            .acquire()
            .await
            .ok_or(DispatchError::Unavailable)?;
        let config = appliance.set_wifi_enabled(enabled).await.map_err(|e| {
            self.session.report_failure(&e);
            DispatchError::FatalPrivilegedOp {
                message: e.to_string(),
            }
        })?;
        info!(enabled = config.enabled, "wifi switched");
        Ok(config.enabled)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::appliance::Connector;
    use crate::command::RemoteCode;
    use crate::testing::{Fail, FakeAppliance, FakeConnector, FakeRemote};

    async fn dispatcher(remote: Option<Arc<FakeRemote>>, open: bool) -> (Arc<FakeAppliance>, CommandDispatcher) {
        let appliance = Arc::new(FakeAppliance::default());
        let connector = Arc::new(FakeConnector::new(Arc::clone(&appliance)));
        let session = Arc::new(SessionManager::new(connector as Arc<dyn Connector>));
        if open {
            session.ensure_open().await.unwrap();
        }
        let remote = remote.map(|r| r as Arc<dyn RemoteKeySender>);
        (appliance, CommandDispatcher::new(session, remote))
    }

    #[tokio::test]
    async fn failed_press_does_not_cancel_the_rest() {
        let remote = Arc::new(FakeRemote {
            fail_presses: vec![2],
            ..FakeRemote::default()
        });
        let (_, dispatcher) = dispatcher(Some(Arc::clone(&remote)), true).await;
        let request = CommandRequest::new(RemoteCode::VolInc, false, 3).unwrap();

        let err = dispatcher.send(request).await.unwrap_err();
        match err {
            DispatchError::Delivery {
                attempted, failed, ..
            } => {
                assert_eq!(attempted, 3);
                assert_eq!(failed, vec![2]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(remote.presses.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn repeat_zero_presses_once() {
        let remote = Arc::new(FakeRemote::default());
        let (_, dispatcher) = dispatcher(Some(Arc::clone(&remote)), true).await;
        let request = CommandRequest::new(RemoteCode::Confirm, true, 0).unwrap();

        dispatcher.send(request).await.unwrap();
        assert_eq!(
            *remote.keys.lock().unwrap(),
            vec![("ok".to_owned(), true)]
        );
    }

    #[tokio::test]
    async fn closed_session_is_unavailable_without_network() {
        let remote = Arc::new(FakeRemote::default());
        let (_, dispatcher) = dispatcher(Some(Arc::clone(&remote)), false).await;
        let request = CommandRequest::new(RemoteCode::Power, false, 0).unwrap();

        assert_eq!(dispatcher.send(request).await, Err(DispatchError::Unavailable));
        assert_eq!(dispatcher.reboot().await, Err(DispatchError::Unavailable));
        assert_eq!(remote.presses.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_remote_is_not_configured() {
        let (_, dispatcher) = dispatcher(None, true).await;
        let request = CommandRequest::new(RemoteCode::Power, false, 0).unwrap();
        assert_eq!(dispatcher.send(request).await, Err(DispatchError::NotConfigured));
    }

    #[tokio::test]
    async fn reboot_timeout_is_fatal() {
        let (appliance, dispatcher) = dispatcher(None, true).await;
        *appliance.reboot.lock().unwrap() = Some(Fail::Timeout);

        let err = dispatcher.reboot().await.unwrap_err();
        assert!(matches!(err, DispatchError::FatalPrivilegedOp { .. }));
        assert_eq!(appliance.reboots.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wifi_switch_reports_the_new_state() {
        let (appliance, dispatcher) = dispatcher(None, true).await;
        assert!(!dispatcher.set_wifi(false).await.unwrap());
        assert!(!appliance.wifi_config.lock().unwrap().as_ref().unwrap().enabled);

        appliance.set_wifi_config(Err(Fail::Denied));
        let err = dispatcher.set_wifi(true).await.unwrap_err();
        assert!(matches!(err, DispatchError::FatalPrivilegedOp { .. }));
    }

    #[tokio::test]
    async fn wifi_switch_needs_an_open_session() {
        let (_, dispatcher) = dispatcher(None, false).await;
        assert_eq!(dispatcher.set_wifi(true).await, Err(DispatchError::Unavailable));
    }
}
