// ── Integration context ──
//
// One `Integration` per appliance. It owns the session, the data store,
// the reconciler and scheduler, the dispatcher and the persisted options,
// and sequences startup and shutdown. Hosts hold a cheap clone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fbxhome_api::ChallengeSigner;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::appliance::{Connector, HttpConnector, RemoteKeySender};
use crate::command::ServiceCall;
use crate::config::ApplianceConfig;
use crate::dispatch::CommandDispatcher;
use crate::error::{CoreError, PollError};
use crate::model::{ApplianceSnapshot, ParentDevice};
use crate::persist::ConfigStore;
use crate::reconcile::Reconciler;
use crate::registry::DeviceRegistry;
use crate::scheduler::{PassRunner, PollScheduler, TriggerOutcome};
use crate::session::{SessionManager, SessionState};
use crate::store::{DataStore, DeviceTable, SnapshotDelta};
use crate::stream::TableStream;

// ── IntegrationStatus ────────────────────────────────────────────────

/// Health of the integration as seen by hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationStatus {
    Starting,
    /// Startup failed; the host may retry `start()` later.
    NotReady { reason: String },
    Available,
    /// The last pass failed; the next successful pass restores `Available`.
    Unavailable { reason: String },
    Stopped,
}

/// Runs the reconciler and keeps the status in step with pass results.
struct StatusRunner {
    reconciler: Arc<Reconciler>,
    status: Arc<watch::Sender<IntegrationStatus>>,
}

#[async_trait]
impl PassRunner for StatusRunner {
    async fn run_pass(&self) -> Result<Arc<SnapshotDelta>, PollError> {
        let result = self.reconciler.reconcile().await;
        self.status.send_if_modified(|status| {
            // Startup and shutdown own the status outside the running phase.
            if !matches!(
                status,
                IntegrationStatus::Available | IntegrationStatus::Unavailable { .. }
            ) {
                return false;
            }
            let next = match &result {
                Ok(_) => IntegrationStatus::Available,
                Err(PollError::Unavailable { reason }) => IntegrationStatus::Unavailable {
                    reason: reason.clone(),
                },
            };
            if *status == next {
                return false;
            }
            *status = next;
            true
        });
        result
    }
}

// ── Integration ──────────────────────────────────────────────────────

/// Per-appliance context. Cloning shares the same state.
#[derive(Clone)]
pub struct Integration {
    inner: Arc<IntegrationInner>,
}

struct IntegrationInner {
    config: ApplianceConfig,
    session: Arc<SessionManager>,
    store: Arc<DataStore>,
    reconciler: Arc<Reconciler>,
    scheduler: PollScheduler,
    dispatcher: CommandDispatcher,
    persisted: Arc<ConfigStore>,
    registry: Arc<dyn DeviceRegistry>,
    status: Arc<watch::Sender<IntegrationStatus>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    /// Set once the stored configuration was read; nothing is written
    /// back before that so an unreadable file is never clobbered.
    loaded: AtomicBool,
    stopped: AtomicBool,
}

impl Integration {
    /// Wire an integration from its parts. Does NOT connect; call
    /// [`start()`](Self::start).
    pub fn new(
        config: ApplianceConfig,
        connector: Arc<dyn Connector>,
        remote: Option<Arc<dyn RemoteKeySender>>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(connector));
        let store = Arc::new(DataStore::new());
        let persisted = Arc::new(ConfigStore::new(&config.state_dir));
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&session),
            Arc::clone(&store),
            Arc::clone(&persisted),
        ));
        let (status, _) = watch::channel(IntegrationStatus::Starting);
        let status = Arc::new(status);
        let scheduler = PollScheduler::new(Arc::new(StatusRunner {
            reconciler: Arc::clone(&reconciler),
            status: Arc::clone(&status),
        }));
        let dispatcher = CommandDispatcher::new(Arc::clone(&session), remote);

        Self {
            inner: Arc::new(IntegrationInner {
                config,
                session,
                store,
                reconciler,
                scheduler,
                dispatcher,
                persisted,
                registry,
                status,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
                loaded: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Production wiring: HTTPS session plus the player remote if one is
    /// configured.
    pub fn connect_http(
        config: ApplianceConfig,
        signer: Arc<dyn ChallengeSigner>,
        registry: Arc<dyn DeviceRegistry>,
    ) -> Result<Self, CoreError> {
        config.base_url()?;
        let remote = HttpConnector::remote(&config)?;
        let connector = Arc::new(HttpConnector::new(config.clone(), signer));
        Ok(Self::new(config, connector, remote, registry))
    }

    pub fn config(&self) -> &ApplianceConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn persisted(&self) -> &Arc<ConfigStore> {
        &self.inner.persisted
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load stored options, open the session, run the initial pass,
    /// register the parent device and start the periodic poll.
    ///
    /// On failure the status is `NotReady`, the session is closed and
    /// `start()` may be called again.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.stopped.load(Ordering::Acquire) {
            return Err(CoreError::Internal("integration was shut down".into()));
        }
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(CoreError::Internal("integration already started".into()));
        }
        self.inner.status.send_replace(IntegrationStatus::Starting);

        match self.start_inner().await {
            Ok(()) => {
                self.inner.status.send_replace(IntegrationStatus::Available);
                info!(
                    host = %self.inner.config.host,
                    interval_secs = self.inner.config.poll_interval.as_secs(),
                    "integration started"
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "integration not ready");
                self.inner.session.close().await;
                self.inner.status.send_replace(IntegrationStatus::NotReady {
                    reason: e.to_string(),
                });
                self.inner.started.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    async fn start_inner(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        if !inner.loaded.load(Ordering::Acquire) {
            let found = inner.persisted.load().await?;
            inner.loaded.store(true, Ordering::Release);
            debug!(found, "stored configuration loaded");
        }

        inner.session.ensure_open().await?;

        match inner.scheduler.trigger_now().await {
            TriggerOutcome::Completed(Ok(delta)) => {
                debug!(added = delta.added.len(), "initial pass complete");
            }
            TriggerOutcome::Completed(Err(PollError::Unavailable { reason })) => {
                return Err(CoreError::ConnectionError { message: reason });
            }
            TriggerOutcome::Skipped => debug!("initial pass already in flight"),
        }

        let system = inner
            .store
            .snapshot()
            .and_then(|s| s.system.clone())
            .ok_or_else(|| CoreError::ConnectionError {
                message: "appliance did not report its system configuration".into(),
            })?;
        let parent = ParentDevice::from_system(&system, inner.config.configuration_url());
        inner.registry.register_parent(&parent).await?;
        info!(mac = %parent.identifier, model = %parent.model, "parent device registered");

        let handle = inner
            .scheduler
            .run_periodic(inner.config.poll_interval, inner.cancel.child_token());
        inner.task_handles.lock().await.push(handle);
        Ok(())
    }

    /// Stop polling, let a pass in flight finish, persist options and
    /// close the session last. Safe to call more than once; later calls do
    /// nothing.
    pub async fn shutdown(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            debug!("integration already stopped");
            return;
        }
        self.inner.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll task ended abnormally");
            }
        }
        // A manual pass may still be running; it finishes before the
        // session goes away and no new one can start.
        self.inner.scheduler.stop().await;

        self.save_options().await;
        self.inner.session.close().await;
        self.inner.status.send_replace(IntegrationStatus::Stopped);
        info!("integration stopped");
    }

    async fn save_options(&self) {
        if !self.inner.loaded.load(Ordering::Acquire) {
            debug!("stored configuration never loaded; not writing it back");
            return;
        }
        if let Err(e) = self.inner.persisted.save().await {
            warn!(error = %e, "failed to save configuration");
        }
    }

    // ── Passes ───────────────────────────────────────────────────────

    /// Run a pass now unless one is already in flight.
    pub async fn refresh_now(&self) -> TriggerOutcome {
        if self.inner.stopped.load(Ordering::Acquire) {
            return TriggerOutcome::Completed(Err(PollError::Unavailable {
                reason: "integration is stopped".into(),
            }));
        }
        self.inner.scheduler.trigger_now().await
    }

    /// Clear an authentication block and re-enable subsystems disabled by
    /// capability checks. Takes effect on the next pass.
    pub async fn reauthorize(&self) {
        self.inner.session.reauthorize().await;
        self.inner.reconciler.reset_capabilities();
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Invoke an inbound service by name. Fields are validated before any
    /// request is made.
    pub async fn call_service(&self, name: &str, fields: &Map<String, Value>) -> Result<(), CoreError> {
        let call = ServiceCall::parse(name, fields)?;
        self.execute(call).await
    }

    pub async fn execute(&self, call: ServiceCall) -> Result<(), CoreError> {
        match call {
            ServiceCall::Remote(request) => Ok(self.inner.dispatcher.send(request).await?),
            ServiceCall::Reboot => {
                // The appliance goes away for a while; keep options safe first.
                self.save_options().await;
                Ok(self.inner.dispatcher.reboot().await?)
            }
            ServiceCall::SetWifi { enabled } => {
                self.inner.dispatcher.set_wifi(enabled).await?;
                Ok(())
            }
        }
    }

    /// Whether a player is configured for remote commands.
    pub fn has_remote(&self) -> bool {
        self.inner.dispatcher.has_remote()
    }

    /// Invert the reported position of a shutter. Applied from the next
    /// pass and persisted on shutdown.
    pub fn set_shutter_inverted(&self, node_id: u64, inverted: bool) {
        self.inner.persisted.update(|config| {
            if inverted {
                config.inverted_shutters.insert(node_id);
            } else {
                config.inverted_shutters.remove(&node_id);
            }
        });
    }

    // ── State access ─────────────────────────────────────────────────

    pub fn status(&self) -> IntegrationStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<IntegrationStatus> {
        self.inner.status.subscribe()
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.session.state()
    }

    pub fn table(&self) -> Arc<DeviceTable> {
        self.inner.store.table()
    }

    pub fn snapshot(&self) -> Option<Arc<ApplianceSnapshot>> {
        self.inner.store.snapshot()
    }

    pub fn stream(&self) -> TableStream {
        self.inner.store.stream()
    }

    pub fn subscribe_deltas(&self) -> broadcast::Receiver<Arc<SnapshotDelta>> {
        self.inner.store.subscribe_deltas()
    }
}
