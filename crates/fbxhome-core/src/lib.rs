//! Sync and command-dispatch engine between `fbxhome-api` and hosts (CLI,
//! home-automation platforms).
//!
//! - **[`Integration`]** - Per-appliance context: [`start()`](Integration::start)
//!   opens the session, runs the initial pass, registers the parent device
//!   and spawns the periodic poll. [`shutdown()`](Integration::shutdown)
//!   tears everything down in order and persists configuration.
//!
//! - **[`SessionManager`]** - Owns the authenticated appliance session:
//!   open once, re-open after failure (with backoff), close on shutdown.
//!
//! - **[`PollScheduler`]** - Fixed-interval and on-demand passes, never
//!   more than one in flight.
//!
//! - **[`Reconciler`]** / **[`DataStore`]** - Concurrent subsystem fetch,
//!   priority merge into the [`DeviceTable`], delta computation and
//!   publication through `watch`/`broadcast` channels.
//!
//! - **[`CommandDispatcher`]** - Remote-control key presses (with repeat)
//!   and reboot, routed from the closed [`ServiceKind`] table.

pub mod appliance;
pub mod command;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod integration;
pub mod model;
pub mod persist;
pub mod reconcile;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use appliance::{Appliance, Connector, HttpConnector, RemoteKeySender};
pub use command::{CommandRequest, MAX_REPEAT, RemoteCode, ServiceCall, ServiceKind};
pub use config::{ApplianceConfig, RemoteConfig, TlsVerification};
pub use dispatch::CommandDispatcher;
pub use error::{CoreError, DispatchError, PollError};
pub use integration::{Integration, IntegrationStatus};
pub use persist::{ConfigStore, PersistedConfig};
pub use reconcile::Reconciler;
pub use registry::{DeviceRegistry, MemoryRegistry};
pub use scheduler::{PassRunner, PollScheduler, SchedulerState, TriggerOutcome};
pub use session::{SessionManager, SessionState};
pub use store::{DataStore, DeviceTable, SnapshotDelta};
pub use stream::TableStream;

pub use model::{
    AlarmState, ApplianceSnapshot, AvailabilityChange, CallRecord, ConnectionInfo, DeviceDetails,
    DeviceKey, DeviceKind, DeviceRecord, DiskInfo, HomeCategory, HostDetails, MacAddress,
    NodeDetails, NodeState, ParentDevice, PartitionInfo, RaidInfo, Sensor, Subsystem, SystemInfo,
    WifiLink,
};
