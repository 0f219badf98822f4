// ── Device records ──

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity_id::DeviceKey;
use super::home::{HomeCategory, NodeState};
use super::snapshot::Subsystem;

/// Kind of tracked device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    Host,
    Node,
}

/// Wi-Fi association of a host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WifiLink {
    /// dBm.
    pub signal: Option<i32>,
    /// Bytes/s.
    pub tx_rate: Option<u64>,
    /// Bytes/s.
    pub rx_rate: Option<u64>,
    /// Seconds since association.
    pub conn_duration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostDetails {
    pub vendor: String,
    pub host_type: String,
    pub addresses: Vec<String>,
    pub wifi: Option<WifiLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub node_id: u64,
    pub category: HomeCategory,
    pub status: String,
    pub model: String,
    pub manufacturer: String,
    pub firmware: Option<String>,
    /// Id of the signal endpoint carrying the node state.
    pub state_endpoint: Option<u64>,
    pub state: Option<NodeState>,
}

/// Subsystem-specific part of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceDetails {
    Host(HostDetails),
    Node(NodeDetails),
}

/// Tracked state for one network host or home-automation node.
///
/// Created on first sighting and never deleted: a record absent from the
/// listings it was last seen in is kept with `reachable = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub key: DeviceKey,
    pub name: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub reachable: bool,
    pub details: DeviceDetails,
    /// Listings the record appeared in when last seen.
    pub sources: BTreeSet<Subsystem>,
}

impl DeviceRecord {
    pub fn kind(&self) -> DeviceKind {
        match self.details {
            DeviceDetails::Host(_) => DeviceKind::Host,
            DeviceDetails::Node(_) => DeviceKind::Node,
        }
    }

    pub fn host(&self) -> Option<&HostDetails> {
        match &self.details {
            DeviceDetails::Host(host) => Some(host),
            DeviceDetails::Node(_) => None,
        }
    }

    pub fn node(&self) -> Option<&NodeDetails> {
        match &self.details {
            DeviceDetails::Node(node) => Some(node),
            DeviceDetails::Host(_) => None,
        }
    }

    /// Equality ignoring `last_seen`, which moves on every pass for
    /// reachable records.
    pub fn same_state(&self, other: &Self) -> bool {
        self.name == other.name
            && self.reachable == other.reachable
            && self.details == other.details
            && self.sources == other.sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MacAddress;

    fn host(name: &str) -> DeviceRecord {
        DeviceRecord {
            key: DeviceKey::Mac(MacAddress::new("aa:bb")),
            name: name.into(),
            last_seen: None,
            reachable: true,
            details: DeviceDetails::Host(HostDetails::default()),
            sources: BTreeSet::from([Subsystem::LanHosts]),
        }
    }

    #[test]
    fn same_state_ignores_last_seen() {
        let a = host("phone");
        let mut b = a.clone();
        b.last_seen = Some(Utc::now());
        assert!(a.same_state(&b));
        b.reachable = false;
        assert!(!a.same_state(&b));
    }

    #[test]
    fn kind_follows_details() {
        assert_eq!(host("phone").kind(), DeviceKind::Host);
    }
}
