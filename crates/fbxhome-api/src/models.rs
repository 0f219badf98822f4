// Wire types for the Freebox session API
//
// Field coverage is limited to what the sync engine consumes. Every field
// carries `#[serde(default)]` because firmware revisions omit fields freely.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── System ───────────────────────────────────────────────────────────

/// `GET system/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub mac: String,
    pub firmware_version: String,
    pub serial: String,
    pub board_name: String,
    /// Human-readable uptime ("3 jours 2 heures ...").
    pub uptime: String,
    pub uptime_val: u64,
    pub model_info: ModelInfo,
    pub sensors: Vec<SystemSensor>,
    pub fans: Vec<SystemSensor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    pub name: String,
    pub pretty_name: String,
}

/// Temperature or fan sensor reported in the system config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSensor {
    pub id: String,
    pub name: String,
    pub value: Option<f64>,
}

/// `GET connection/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionStatus {
    pub state: String,
    #[serde(rename = "type")]
    pub link_type: String,
    pub media: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    /// Current download rate, bytes/s.
    pub rate_down: u64,
    /// Current upload rate, bytes/s.
    pub rate_up: u64,
    pub bandwidth_down: u64,
    pub bandwidth_up: u64,
}

// ── LAN / Wi-Fi ──────────────────────────────────────────────────────

/// Entry from `GET lan/browser/{interface}/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanHost {
    pub id: String,
    pub primary_name: String,
    pub host_type: String,
    pub vendor_name: String,
    pub active: bool,
    pub reachable: bool,
    /// Epoch seconds.
    pub last_time_reachable: Option<i64>,
    /// Epoch seconds.
    pub last_activity: Option<i64>,
    pub l2ident: L2Ident,
    pub l3connectivities: Vec<L3Connectivity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct L2Ident {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct L3Connectivity {
    pub addr: String,
    pub af: String,
    pub active: bool,
    pub reachable: bool,
}

/// Entry from `GET wifi/ap/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiAccessPoint {
    pub id: u64,
    pub name: String,
}

/// Entry from `GET wifi/ap/{id}/stations/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiStation {
    pub id: String,
    pub mac: String,
    pub hostname: String,
    pub state: String,
    pub signal: Option<i32>,
    pub inactive: Option<u64>,
    pub conn_duration: Option<u64>,
    pub tx_rate: Option<u64>,
    pub rx_rate: Option<u64>,
    pub host: Option<LanHost>,
}

/// `GET wifi/config/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiGlobalConfig {
    pub enabled: bool,
    pub mac_filter_state: String,
}

// ── Storage ──────────────────────────────────────────────────────────

/// Entry from `GET storage/disk/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Disk {
    pub id: u64,
    pub model: String,
    pub serial: String,
    pub firmware: String,
    pub state: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub total_bytes: u64,
    /// Degrees Celsius, when the disk reports it.
    pub temp: Option<i64>,
    pub partitions: Vec<DiskPartition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskPartition {
    pub id: u64,
    pub label: String,
    pub fstype: String,
    pub state: String,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_bytes: u64,
}

/// Entry from `GET storage/raid/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaidArray {
    pub id: u64,
    pub name: String,
    pub state: String,
    pub level: String,
    pub degraded: bool,
}

// ── Telephony ────────────────────────────────────────────────────────

/// Entry from `GET call/log/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallEntry {
    pub id: u64,
    pub number: String,
    pub name: String,
    /// `missed`, `accepted` or `outgoing`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Epoch seconds.
    pub datetime: i64,
    /// Seconds.
    pub duration: u64,
    /// Not yet acknowledged on the appliance.
    pub new: bool,
    pub contact_id: u64,
}

// ── Home automation ──────────────────────────────────────────────────

/// Entry from `GET home/nodes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeNode {
    pub id: u64,
    pub label: String,
    pub name: String,
    pub category: String,
    pub status: String,
    pub props: serde_json::Map<String, Value>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub show_endpoints: Vec<ShowEndpoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeType {
    pub inherit: String,
    pub label: String,
    pub name: String,
    pub endpoints: Vec<NodeTypeEndpoint>,
}

/// Endpoint declared by the node type (no value).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeTypeEndpoint {
    pub id: u64,
    pub name: String,
    pub ep_type: String,
    pub value_type: String,
}

/// Endpoint with the value captured at listing time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowEndpoint {
    pub id: u64,
    pub name: String,
    pub label: String,
    pub ep_type: String,
    pub value_type: String,
    pub value: Value,
}

/// `GET home/endpoints/{node_id}/{endpoint_id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointValue {
    pub value: Value,
    pub value_type: String,
    pub refresh: Option<u64>,
}
