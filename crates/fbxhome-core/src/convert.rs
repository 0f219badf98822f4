// ── API-to-domain type conversions ──
//
// Bridges raw `fbxhome_api` response types into `fbxhome_core::model`
// types. Listings become `Sighting`s (one per device seen in a subsystem)
// that the reconciler merges; system-level responses map directly.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;

use fbxhome_api::models::{
    CallEntry, ConnectionStatus, Disk, DiskPartition, HomeNode, LanHost, RaidArray, SystemConfig,
    WifiStation,
};

use crate::model::{
    AlarmState, CallRecord, ConnectionInfo, DeviceKey, DiskInfo, HomeCategory, MacAddress,
    NodeDetails, NodeState, ParentDevice, PartitionInfo, RaidInfo, Sensor, Subsystem, SystemInfo,
    WifiLink,
};

/// Host type the appliance itself is tracked under.
pub const ROUTER_HOST_TYPE: &str = "router";

const SOMFY_INHERITS: [&str; 2] = ["node::rts", "node::ios"];

// ── Helpers ────────────────────────────────────────────────────────

/// Convert an optional epoch-seconds timestamp to `DateTime<Utc>`.
fn epoch_to_datetime(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch
        .filter(|ts| *ts > 0)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

// ── System ─────────────────────────────────────────────────────────

impl From<&SystemConfig> for SystemInfo {
    fn from(cfg: &SystemConfig) -> Self {
        Self {
            model: cfg.model_info.name.clone(),
            pretty_name: cfg.model_info.pretty_name.clone(),
            firmware: cfg.firmware_version.clone(),
            mac: cfg.mac.clone(),
            serial: cfg.serial.clone(),
            uptime_secs: cfg.uptime_val,
            sensors: cfg
                .sensors
                .iter()
                .map(|s| Sensor {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    value: s.value,
                })
                .collect(),
        }
    }
}

impl From<&ConnectionStatus> for ConnectionInfo {
    fn from(status: &ConnectionStatus) -> Self {
        Self {
            state: status.state.clone(),
            media: status.media.clone(),
            ipv4: status.ipv4.clone().filter(|s| !s.is_empty()),
            ipv6: status.ipv6.clone().filter(|s| !s.is_empty()),
            rate_down: status.rate_down,
            rate_up: status.rate_up,
        }
    }
}

// ── Storage and telephony ──────────────────────────────────────────

impl From<&DiskPartition> for PartitionInfo {
    fn from(part: &DiskPartition) -> Self {
        Self {
            id: part.id,
            label: part.label.clone(),
            total_bytes: part.total_bytes,
            free_bytes: part.free_bytes,
            free_percent: free_percent(part.free_bytes, part.total_bytes),
        }
    }
}

impl From<&Disk> for DiskInfo {
    fn from(disk: &Disk) -> Self {
        Self {
            id: disk.id,
            model: disk.model.clone(),
            firmware: disk.firmware.clone(),
            kind: disk.kind.clone(),
            temperature: disk.temp,
            partitions: disk.partitions.iter().map(PartitionInfo::from).collect(),
        }
    }
}

impl From<&RaidArray> for RaidInfo {
    fn from(raid: &RaidArray) -> Self {
        Self {
            id: raid.id,
            name: raid.name.clone(),
            state: raid.state.clone(),
            degraded: raid.degraded,
        }
    }
}

impl From<&CallEntry> for CallRecord {
    fn from(call: &CallEntry) -> Self {
        Self {
            id: call.id,
            number: call.number.clone(),
            name: non_empty(&call.name).unwrap_or_else(|| call.number.clone()),
            kind: call.kind.clone(),
            at: epoch_to_datetime(Some(call.datetime)),
            duration_secs: call.duration,
            new: call.new,
        }
    }
}

/// Free space in percent rounded to two decimals.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn free_percent(free: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| (free as f64 * 10_000.0 / total as f64).round() / 100.0)
}

// ── Sightings ──────────────────────────────────────────────────────

/// What one listing says about one device in one pass.
#[derive(Debug, Clone)]
pub(crate) struct Sighting {
    pub key: DeviceKey,
    pub source: Subsystem,
    pub name: Option<String>,
    /// Listed as active (not merely known) by this listing.
    pub active: bool,
    /// Appliance-reported last-reachable time.
    pub reported_seen: Option<DateTime<Utc>>,
    pub update: DetailsUpdate,
}

/// Subsystem-specific fields carried by a sighting.
#[derive(Debug, Clone)]
pub(crate) enum DetailsUpdate {
    Host {
        vendor: String,
        host_type: String,
        addresses: Vec<String>,
    },
    Wifi {
        link: WifiLink,
        vendor: Option<String>,
    },
    Node(NodeDetails),
}

/// The appliance itself, listed by the System subsystem.
pub(crate) fn router_sighting(system: &SystemInfo) -> Option<Sighting> {
    let mac = MacAddress::new(&system.mac);
    if mac.is_empty() {
        return None;
    }
    Some(Sighting {
        key: DeviceKey::Mac(mac),
        source: Subsystem::System,
        name: non_empty(&system.pretty_name),
        active: true,
        reported_seen: None,
        update: DetailsUpdate::Host {
            vendor: ParentDevice::MANUFACTURER.into(),
            host_type: ROUTER_HOST_TYPE.into(),
            addresses: Vec::new(),
        },
    })
}

/// LAN browser entry. Entries without an L2 identity are not trackable.
pub(crate) fn host_sighting(host: &LanHost) -> Option<Sighting> {
    let mac = MacAddress::new(&host.l2ident.id);
    if mac.is_empty() {
        return None;
    }
    let reported_seen = epoch_to_datetime(host.last_time_reachable)
        .max(epoch_to_datetime(host.last_activity));
    Some(Sighting {
        key: DeviceKey::Mac(mac),
        source: Subsystem::LanHosts,
        name: non_empty(&host.primary_name),
        active: host.active,
        reported_seen,
        update: DetailsUpdate::Host {
            vendor: host.vendor_name.clone(),
            host_type: host.host_type.clone(),
            addresses: host
                .l3connectivities
                .iter()
                .filter(|l3| l3.active)
                .map(|l3| l3.addr.clone())
                .collect(),
        },
    })
}

/// Wi-Fi station. Presence in the station list means associated.
pub(crate) fn station_sighting(station: &WifiStation) -> Option<Sighting> {
    let mac = MacAddress::new(&station.mac);
    if mac.is_empty() {
        return None;
    }
    let host = station.host.as_ref();
    let name = non_empty(&station.hostname)
        .or_else(|| host.and_then(|h| non_empty(&h.primary_name)));
    Some(Sighting {
        key: DeviceKey::Mac(mac),
        source: Subsystem::WifiClients,
        name,
        active: true,
        reported_seen: host.and_then(|h| epoch_to_datetime(h.last_time_reachable)),
        update: DetailsUpdate::Wifi {
            link: WifiLink {
                signal: station.signal,
                tx_rate: station.tx_rate,
                rx_rate: station.rx_rate,
                conn_duration: station.conn_duration,
            },
            vendor: host.and_then(|h| non_empty(&h.vendor_name)),
        },
    })
}

/// Home node, if its category is tracked.
pub(crate) fn node_sighting(node: &HomeNode, inverted: &BTreeSet<u64>) -> Option<Sighting> {
    let category = HomeCategory::from_str(&node.category).ok()?;

    let state_name = category.state_endpoint();
    let state_endpoint = state_name.and_then(|name| {
        node.node_type
            .endpoints
            .iter()
            .find(|ep| ep.ep_type == "signal" && ep.name == name)
            .map(|ep| ep.id)
            .or_else(|| {
                node.show_endpoints
                    .iter()
                    .find(|ep| ep.ep_type == "signal" && ep.name == name)
                    .map(|ep| ep.id)
            })
    });
    let state = state_name.and_then(|name| {
        node.show_endpoints
            .iter()
            .find(|ep| ep.name == name)
            .and_then(|ep| node_state(category, &ep.value, inverted.contains(&node.id)))
    });

    let manufacturer = if SOMFY_INHERITS.contains(&node.node_type.inherit.as_str()) {
        "Somfy"
    } else {
        ParentDevice::MANUFACTURER
    };

    let name = non_empty(&node.label).or_else(|| non_empty(&node.name));

    Some(Sighting {
        key: DeviceKey::Node(node.id),
        source: Subsystem::HomeNodes,
        name,
        active: node.status == "active",
        reported_seen: None,
        update: DetailsUpdate::Node(NodeDetails {
            node_id: node.id,
            category,
            status: node.status.clone(),
            model: category.model().into(),
            manufacturer: manufacturer.into(),
            firmware: node
                .props
                .get("FwVersion")
                .and_then(Value::as_str)
                .map(str::to_owned),
            state_endpoint,
            state,
        }),
    })
}

/// Interpret a raw state-signal value for `category`.
pub(crate) fn node_state(category: HomeCategory, raw: &Value, inverted: bool) -> Option<NodeState> {
    match category {
        HomeCategory::Alarm => raw.as_str().map(|s| NodeState::Alarm {
            state: AlarmState::from_signal(s),
        }),
        HomeCategory::Camera => raw.as_bool().map(|detection| NodeState::Camera { detection }),
        HomeCategory::Shutter | HomeCategory::Opener => {
            let percent = raw
                .as_u64()
                .or_else(|| raw.as_f64().map(f64_to_percent))?
                .min(100);
            let position = u8::try_from(percent).ok()?;
            let position = if inverted { 100 - position } else { position };
            Some(NodeState::Shutter { position })
        }
        HomeCategory::BasicShutter => raw.as_bool().map(|closed| NodeState::BasicShutter { closed }),
        HomeCategory::Dws
        | HomeCategory::Iohome
        | HomeCategory::Kfb
        | HomeCategory::Pir
        | HomeCategory::Rts => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn f64_to_percent(raw: f64) -> u64 {
    raw.round().clamp(0.0, 100.0) as u64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{home_node, lan_host, station, system_config};

    #[test]
    fn router_sighting_uses_pretty_name_and_vendor() {
        let system = SystemInfo::from(&system_config());
        let sighting = router_sighting(&system).unwrap();
        assert_eq!(sighting.key.to_string(), "f4:ca:e5:00:00:01");
        assert_eq!(sighting.name.as_deref(), Some("Freebox v7 (r1)"));
        assert!(sighting.active);
        match sighting.update {
            DetailsUpdate::Host { vendor, host_type, .. } => {
                assert_eq!(vendor, "Freebox SAS");
                assert_eq!(host_type, "router");
            }
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[test]
    fn host_without_l2ident_is_dropped() {
        let mut host = lan_host("", "ghost", true);
        host.l2ident.id.clear();
        assert!(host_sighting(&host).is_none());
    }

    #[test]
    fn host_reported_seen_prefers_latest_timestamp() {
        let mut host = lan_host("AA:BB:CC:DD:EE:FF", "nas", false);
        host.last_time_reachable = Some(1_700_000_000);
        host.last_activity = Some(1_700_000_500);
        let sighting = host_sighting(&host).unwrap();
        assert_eq!(sighting.reported_seen.unwrap().timestamp(), 1_700_000_500);
        assert!(!sighting.active);
    }

    #[test]
    fn station_falls_back_to_host_name() {
        let mut sta = station("AA:BB:CC:DD:EE:01", "", -60);
        sta.host = Some(lan_host("AA:BB:CC:DD:EE:01", "tablet", true));
        let sighting = station_sighting(&sta).unwrap();
        assert_eq!(sighting.name.as_deref(), Some("tablet"));
    }

    #[test]
    fn unsupported_category_is_filtered() {
        let node = home_node(9, "thermostat", None);
        assert!(node_sighting(&node, &BTreeSet::new()).is_none());
    }

    #[test]
    fn shutter_position_is_inverted_when_configured() {
        let node = home_node(12, "shutter", Some(("position_set", 3, json!(30))));
        let plain = node_sighting(&node, &BTreeSet::new()).unwrap();
        let inverted = node_sighting(&node, &BTreeSet::from([12])).unwrap();

        let position = |s: Sighting| match s.update {
            DetailsUpdate::Node(details) => details.state,
            _ => None,
        };
        assert_eq!(position(plain), Some(NodeState::Shutter { position: 30 }));
        assert_eq!(position(inverted), Some(NodeState::Shutter { position: 70 }));
    }

    #[test]
    fn rts_nodes_are_somfy() {
        let mut node = home_node(4, "rts", None);
        node.node_type.inherit = "node::rts".into();
        let sighting = node_sighting(&node, &BTreeSet::new()).unwrap();
        match sighting.update {
            DetailsUpdate::Node(details) => {
                assert_eq!(details.manufacturer, "Somfy");
                assert_eq!(details.model, "RTS");
                assert_eq!(details.state_endpoint, None);
            }
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[test]
    fn alarm_and_camera_states() {
        assert_eq!(
            node_state(HomeCategory::Alarm, &json!("alarm1_arming"), false),
            Some(NodeState::Alarm {
                state: AlarmState::Arming
            })
        );
        assert_eq!(
            node_state(HomeCategory::Camera, &json!(true), false),
            Some(NodeState::Camera { detection: true })
        );
        assert_eq!(
            node_state(HomeCategory::BasicShutter, &json!(false), false),
            Some(NodeState::BasicShutter { closed: false })
        );
        assert_eq!(node_state(HomeCategory::Alarm, &json!(3), false), None);
    }

    #[test]
    fn shutter_position_clamps() {
        assert_eq!(
            node_state(HomeCategory::Shutter, &json!(250), false),
            Some(NodeState::Shutter { position: 100 })
        );
        assert_eq!(
            node_state(HomeCategory::Opener, &json!(42.6), false),
            Some(NodeState::Shutter { position: 43 })
        );
    }

    #[test]
    fn partition_free_percent_has_two_decimals() {
        let part = |free, total| {
            PartitionInfo::from(&DiskPartition {
                free_bytes: free,
                total_bytes: total,
                ..DiskPartition::default()
            })
        };
        assert_eq!(part(1, 3).free_percent, Some(33.33));
        assert_eq!(part(250, 1000).free_percent, Some(25.0));
        assert_eq!(part(0, 0).free_percent, None);
    }

    #[test]
    fn anonymous_caller_is_named_by_number() {
        let record = CallRecord::from(&CallEntry {
            number: "0601020304".into(),
            kind: "missed".into(),
            datetime: 1_700_000_000,
            new: true,
            ..CallEntry::default()
        });
        assert_eq!(record.name, "0601020304");
        assert_eq!(record.at.unwrap().timestamp(), 1_700_000_000);
        assert!(record.is_new_missed());
    }
}
