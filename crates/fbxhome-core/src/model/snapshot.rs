// ── Snapshot and system-level types ──

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fbxhome_api::models::{HomeNode, LanHost, WifiStation};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::entity_id::DeviceKey;
use super::home::NodeState;

/// Independently fetched slice of appliance state.
///
/// Declaration order is merge priority: earlier subsystems win name
/// conflicts within a pass. Only the listings (system, LAN hosts, Wi-Fi
/// clients, home nodes) produce devices; the rest enrich the snapshot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Subsystem {
    System,
    Connection,
    LanHosts,
    WifiClients,
    HomeNodes,
    HomeStates,
    /// Global Wi-Fi switch.
    WifiConfig,
    Disks,
    /// Disabled for good on appliances that refuse the RAID listing.
    Raids,
    CallLog,
}

/// Temperature sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: String,
    pub name: String,
    /// Degrees Celsius.
    pub value: Option<f64>,
}

/// Appliance identity and health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub model: String,
    pub pretty_name: String,
    pub firmware: String,
    pub mac: String,
    pub serial: String,
    pub uptime_secs: u64,
    pub sensors: Vec<Sensor>,
}

/// WAN connection status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub state: String,
    pub media: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    /// Bytes/s.
    pub rate_down: u64,
    /// Bytes/s.
    pub rate_up: u64,
}

/// Partition usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub id: u64,
    pub label: String,
    pub total_bytes: u64,
    pub free_bytes: u64,
    /// Free space in percent, two decimals. `None` for an empty partition.
    pub free_percent: Option<f64>,
}

/// Disk attached to the appliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub id: u64,
    pub model: String,
    pub firmware: String,
    /// `internal`, `usb`, `sata`...
    pub kind: String,
    /// Degrees Celsius.
    pub temperature: Option<i64>,
    pub partitions: Vec<PartitionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaidInfo {
    pub id: u64,
    pub name: String,
    pub state: String,
    pub degraded: bool,
}

/// One entry of the fixed-line call history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: u64,
    pub number: String,
    /// Contact name, or the number when the caller is unknown.
    pub name: String,
    /// `missed`, `accepted` or `outgoing`.
    pub kind: String,
    pub at: Option<DateTime<Utc>>,
    pub duration_secs: u64,
    /// Not yet acknowledged on the appliance.
    pub new: bool,
}

impl CallRecord {
    pub const MISSED: &'static str = "missed";

    /// A missed call nobody has looked at yet.
    pub fn is_new_missed(&self) -> bool {
        self.new && self.kind == Self::MISSED
    }
}

/// Immutable result of one pass.
///
/// Subsystems that failed carry the previous snapshot's value forward and
/// are listed in `stale`.
#[derive(Debug, Clone, Serialize)]
pub struct ApplianceSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub system: Option<SystemInfo>,
    pub connection: Option<ConnectionInfo>,
    pub hosts: Vec<LanHost>,
    pub stations: Vec<WifiStation>,
    pub nodes: Vec<HomeNode>,
    pub node_states: Vec<(u64, NodeState)>,
    /// `None` until the Wi-Fi configuration was read once.
    pub wifi_enabled: Option<bool>,
    pub disks: Vec<DiskInfo>,
    pub raids: Vec<RaidInfo>,
    pub calls: Vec<CallRecord>,
    pub stale: BTreeSet<Subsystem>,
    /// Subsystems disabled by capability checks.
    pub skipped: BTreeSet<Subsystem>,
}

impl ApplianceSnapshot {
    /// New missed calls, newest first as the appliance lists them.
    pub fn missed_calls(&self) -> impl Iterator<Item = &CallRecord> {
        self.calls.iter().filter(|c| c.is_new_missed())
    }
}

/// Reachability flip reported in a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityChange {
    pub key: DeviceKey,
    pub reachable: bool,
}

/// Parent device registered with the host's device registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentDevice {
    /// MAC identifier.
    pub identifier: String,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
    pub sw_version: String,
    pub configuration_url: String,
}

impl ParentDevice {
    pub const MANUFACTURER: &'static str = "Freebox SAS";

    pub fn from_system(system: &SystemInfo, configuration_url: String) -> Self {
        Self {
            identifier: system.mac.clone(),
            manufacturer: Self::MANUFACTURER.into(),
            model: system.model.clone(),
            name: system.pretty_name.clone(),
            sw_version: system.firmware.clone(),
            configuration_url,
        }
    }
}
