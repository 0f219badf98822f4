// In-memory appliance fakes shared by the unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fbxhome_api::Error;
use fbxhome_api::models::{
    CallEntry, ConnectionStatus, Disk, DiskPartition, EndpointValue, HomeNode, L2Ident, LanHost,
    ModelInfo, NodeType, NodeTypeEndpoint, RaidArray, ShowEndpoint, SystemConfig, SystemSensor,
    WifiGlobalConfig, WifiStation,
};
use serde_json::Value;

use crate::appliance::{Appliance, Connector, RemoteKeySender};

/// Scripted failure, turned into a fresh `fbxhome_api::Error` per call.
#[derive(Debug, Clone)]
pub(crate) enum Fail {
    Api(&'static str),
    SessionExpired,
    Denied,
    Timeout,
    Http(u16),
}

impl Fail {
    pub(crate) fn to_error(&self) -> Error {
        match self {
            Self::Api(code) => Error::Api {
                code: (*code).into(),
                message: "scripted".into(),
            },
            Self::SessionExpired => Error::SessionExpired,
            Self::Denied => Error::InsufficientRights {
                message: "scripted".into(),
            },
            Self::Timeout => Error::Timeout { timeout_secs: 10 },
            Self::Http(status) => Error::Http {
                status: *status,
                message: "scripted".into(),
            },
        }
    }
}

type Reply<T> = Mutex<Result<T, Fail>>;

fn reply<T: Clone>(slot: &Reply<T>) -> Result<T, Error> {
    slot.lock().unwrap().clone().map_err(|f| f.to_error())
}

pub(crate) struct FakeAppliance {
    pub system: Reply<SystemConfig>,
    pub connection: Reply<ConnectionStatus>,
    pub hosts: Reply<Vec<LanHost>>,
    pub stations: Reply<Vec<WifiStation>>,
    pub nodes: Reply<Vec<HomeNode>>,
    pub wifi_config: Reply<WifiGlobalConfig>,
    pub disks: Reply<Vec<Disk>>,
    pub raids: Reply<Vec<RaidArray>>,
    pub calls: Reply<Vec<CallEntry>>,
    pub endpoint_values: Mutex<HashMap<(u64, u64), Result<Value, Fail>>>,
    pub reboot: Mutex<Option<Fail>>,
    /// Artificial latency applied to `system_config`.
    pub delay: Mutex<Option<Duration>>,
    pub reboots: AtomicUsize,
    pub closes: AtomicUsize,
    pub host_fetches: AtomicUsize,
    pub endpoint_reads: AtomicUsize,
    pub raid_fetches: AtomicUsize,
}

impl Default for FakeAppliance {
    fn default() -> Self {
        Self {
            system: Mutex::new(Ok(system_config())),
            connection: Mutex::new(Ok(connection_status())),
            hosts: Mutex::new(Ok(Vec::new())),
            stations: Mutex::new(Ok(Vec::new())),
            nodes: Mutex::new(Ok(Vec::new())),
            wifi_config: Mutex::new(Ok(WifiGlobalConfig {
                enabled: true,
                ..WifiGlobalConfig::default()
            })),
            disks: Mutex::new(Ok(Vec::new())),
            raids: Mutex::new(Ok(Vec::new())),
            calls: Mutex::new(Ok(Vec::new())),
            endpoint_values: Mutex::new(HashMap::new()),
            reboot: Mutex::new(None),
            delay: Mutex::new(None),
            reboots: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            host_fetches: AtomicUsize::new(0),
            endpoint_reads: AtomicUsize::new(0),
            raid_fetches: AtomicUsize::new(0),
        }
    }
}

impl FakeAppliance {
    pub(crate) fn set_hosts(&self, hosts: Result<Vec<LanHost>, Fail>) {
        *self.hosts.lock().unwrap() = hosts;
    }

    pub(crate) fn set_stations(&self, stations: Result<Vec<WifiStation>, Fail>) {
        *self.stations.lock().unwrap() = stations;
    }

    pub(crate) fn set_nodes(&self, nodes: Result<Vec<HomeNode>, Fail>) {
        *self.nodes.lock().unwrap() = nodes;
    }

    pub(crate) fn set_disks(&self, disks: Result<Vec<Disk>, Fail>) {
        *self.disks.lock().unwrap() = disks;
    }

    pub(crate) fn set_raids(&self, raids: Result<Vec<RaidArray>, Fail>) {
        *self.raids.lock().unwrap() = raids;
    }

    pub(crate) fn set_calls(&self, calls: Result<Vec<CallEntry>, Fail>) {
        *self.calls.lock().unwrap() = calls;
    }

    pub(crate) fn set_wifi_config(&self, config: Result<WifiGlobalConfig, Fail>) {
        *self.wifi_config.lock().unwrap() = config;
    }

    pub(crate) fn set_endpoint(&self, node_id: u64, endpoint_id: u64, value: Result<Value, Fail>) {
        self.endpoint_values
            .lock()
            .unwrap()
            .insert((node_id, endpoint_id), value);
    }

    pub(crate) fn fail_everything(&self, fail: &Fail) {
        *self.system.lock().unwrap() = Err(fail.clone());
        *self.connection.lock().unwrap() = Err(fail.clone());
        *self.hosts.lock().unwrap() = Err(fail.clone());
        *self.stations.lock().unwrap() = Err(fail.clone());
        *self.nodes.lock().unwrap() = Err(fail.clone());
        *self.wifi_config.lock().unwrap() = Err(fail.clone());
        *self.disks.lock().unwrap() = Err(fail.clone());
        *self.raids.lock().unwrap() = Err(fail.clone());
        *self.calls.lock().unwrap() = Err(fail.clone());
    }
}

#[async_trait]
impl Appliance for FakeAppliance {
    async fn system_config(&self) -> Result<SystemConfig, Error> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply(&self.system)
    }

    async fn connection_status(&self) -> Result<ConnectionStatus, Error> {
        reply(&self.connection)
    }

    async fn lan_hosts(&self) -> Result<Vec<LanHost>, Error> {
        self.host_fetches.fetch_add(1, Ordering::SeqCst);
        reply(&self.hosts)
    }

    async fn wifi_stations(&self) -> Result<Vec<WifiStation>, Error> {
        reply(&self.stations)
    }

    async fn wifi_global_config(&self) -> Result<WifiGlobalConfig, Error> {
        reply(&self.wifi_config)
    }

    async fn set_wifi_enabled(&self, enabled: bool) -> Result<WifiGlobalConfig, Error> {
        let mut slot = self.wifi_config.lock().unwrap();
        let config = slot.as_mut().map_err(|f| f.to_error())?;
        config.enabled = enabled;
        Ok(config.clone())
    }

    async fn storage_disks(&self) -> Result<Vec<Disk>, Error> {
        reply(&self.disks)
    }

    async fn storage_raids(&self) -> Result<Vec<RaidArray>, Error> {
        self.raid_fetches.fetch_add(1, Ordering::SeqCst);
        reply(&self.raids)
    }

    async fn call_log(&self) -> Result<Vec<CallEntry>, Error> {
        reply(&self.calls)
    }

    async fn home_nodes(&self) -> Result<Vec<HomeNode>, Error> {
        reply(&self.nodes)
    }

    async fn home_endpoint_value(&self, node_id: u64, endpoint_id: u64) -> Result<EndpointValue, Error> {
        self.endpoint_reads.fetch_add(1, Ordering::SeqCst);
        let values = self.endpoint_values.lock().unwrap();
        match values.get(&(node_id, endpoint_id)) {
            Some(Ok(value)) => Ok(EndpointValue {
                value: value.clone(),
                ..EndpointValue::default()
            }),
            Some(Err(fail)) => Err(fail.to_error()),
            None => Err(Fail::Api("noent").to_error()),
        }
    }

    async fn reboot(&self) -> Result<(), Error> {
        self.reboots.fetch_add(1, Ordering::SeqCst);
        match self.reboot.lock().unwrap().as_ref() {
            Some(fail) => Err(fail.to_error()),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<(), Error> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out the same fake appliance; open results can be scripted.
pub(crate) struct FakeConnector {
    pub appliance: Arc<FakeAppliance>,
    pub script: Mutex<VecDeque<Fail>>,
    pub opens: AtomicUsize,
}

impl FakeConnector {
    pub(crate) fn new(appliance: Arc<FakeAppliance>) -> Self {
        Self {
            appliance,
            script: Mutex::new(VecDeque::new()),
            opens: AtomicUsize::new(0),
        }
    }

    /// Queue failures for the next `open()` calls.
    pub(crate) fn fail_next(&self, fails: impl IntoIterator<Item = Fail>) {
        self.script.lock().unwrap().extend(fails);
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self) -> Result<Arc<dyn Appliance>, Error> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(fail) => Err(fail.to_error()),
            None => Ok(Arc::clone(&self.appliance) as Arc<dyn Appliance>),
        }
    }
}

/// Records key presses; fails the presses whose 1-based index is listed.
#[derive(Default)]
pub(crate) struct FakeRemote {
    pub fail_presses: Vec<u32>,
    pub presses: AtomicU32,
    pub keys: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl RemoteKeySender for FakeRemote {
    async fn send_key(&self, key: &str, long_press: bool) -> Result<(), Error> {
        let index = self.presses.fetch_add(1, Ordering::SeqCst) + 1;
        self.keys.lock().unwrap().push((key.to_owned(), long_press));
        if self.fail_presses.contains(&index) {
            return Err(Fail::Http(500).to_error());
        }
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub(crate) const ROUTER_MAC: &str = "F4:CA:E5:00:00:01";

pub(crate) fn system_config() -> SystemConfig {
    SystemConfig {
        mac: ROUTER_MAC.into(),
        firmware_version: "4.8.6".into(),
        serial: "123456".into(),
        uptime_val: 3600,
        model_info: ModelInfo {
            name: "fbxgw7-r1/full".into(),
            pretty_name: "Freebox v7 (r1)".into(),
        },
        sensors: vec![SystemSensor {
            id: "temp_cpum".into(),
            name: "Température CPU M".into(),
            value: Some(61.0),
        }],
        ..SystemConfig::default()
    }
}

pub(crate) fn connection_status() -> ConnectionStatus {
    ConnectionStatus {
        state: "up".into(),
        media: "ftth".into(),
        ipv4: Some("203.0.113.7".into()),
        rate_down: 1200,
        rate_up: 300,
        ..ConnectionStatus::default()
    }
}

pub(crate) fn lan_host(mac: &str, name: &str, active: bool) -> LanHost {
    LanHost {
        id: format!("ether-{mac}"),
        primary_name: name.into(),
        host_type: "smartphone".into(),
        vendor_name: "Acme".into(),
        active,
        l2ident: L2Ident {
            id: mac.into(),
            kind: "mac_address".into(),
        },
        ..LanHost::default()
    }
}

pub(crate) fn station(mac: &str, hostname: &str, signal: i32) -> WifiStation {
    WifiStation {
        id: mac.into(),
        mac: mac.into(),
        hostname: hostname.into(),
        state: "authenticated".into(),
        signal: Some(signal),
        ..WifiStation::default()
    }
}

/// Home node of `category` whose state signal is endpoint `state_ep`.
pub(crate) fn home_node(id: u64, category: &str, state_ep: Option<(&str, u64, Value)>) -> HomeNode {
    let (endpoints, show) = match state_ep {
        Some((name, ep_id, value)) => (
            vec![NodeTypeEndpoint {
                id: ep_id,
                name: name.into(),
                ep_type: "signal".into(),
                value_type: String::new(),
            }],
            vec![ShowEndpoint {
                id: ep_id,
                name: name.into(),
                ep_type: "signal".into(),
                value,
                ..ShowEndpoint::default()
            }],
        ),
        None => (Vec::new(), Vec::new()),
    };
    HomeNode {
        id,
        label: format!("{category} {id}"),
        category: category.into(),
        status: "active".into(),
        node_type: NodeType {
            inherit: "node::domus".into(),
            endpoints,
            ..NodeType::default()
        },
        show_endpoints: show,
        ..HomeNode::default()
    }
}

pub(crate) fn disk(id: u64, free_bytes: u64, total_bytes: u64) -> Disk {
    Disk {
        id,
        model: "ST1000LM035".into(),
        kind: "internal".into(),
        state: "enabled".into(),
        total_bytes,
        temp: Some(40),
        partitions: vec![DiskPartition {
            id: id + 1,
            label: "Disque dur".into(),
            total_bytes,
            free_bytes,
            ..DiskPartition::default()
        }],
        ..Disk::default()
    }
}

pub(crate) fn call(id: u64, kind: &str, new: bool) -> CallEntry {
    CallEntry {
        id,
        number: format!("060102030{id}"),
        kind: kind.into(),
        datetime: 1_700_000_000 + i64::try_from(id).unwrap(),
        new,
        ..CallEntry::default()
    }
}
