// ── Identity types ──
//
// MacAddress and DeviceKey form the foundation of the device table.
// Network hosts are keyed by MAC, home-automation nodes by the node id the
// appliance assigns; both live in the same table behind one key type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated or dash-separated input.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().to_lowercase().replace('-', ":");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

// ── DeviceKey ───────────────────────────────────────────────────────

/// Stable key of a device record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceKey {
    /// Network host (LAN browser, Wi-Fi station, the appliance itself).
    Mac(MacAddress),
    /// Home-automation node id.
    Node(u64),
}

impl DeviceKey {
    pub fn as_mac(&self) -> Option<&MacAddress> {
        match self {
            Self::Mac(mac) => Some(mac),
            Self::Node(_) => None,
        }
    }
}

impl From<MacAddress> for DeviceKey {
    fn from(mac: MacAddress) -> Self {
        Self::Mac(mac)
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mac(mac) => write!(f, "{mac}"),
            Self::Node(id) => write!(f, "node:{id}"),
        }
    }
}
