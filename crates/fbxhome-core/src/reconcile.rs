// ── State reconciler ──
//
// One pass: make sure the session is open, fetch every subsystem
// concurrently, merge the results into a copy of the device table in
// fixed priority order, compute the delta against the previous table and
// publish table, snapshot and delta together.
//
// A failed subsystem is stale for the pass: its previous values are kept
// and it cannot flip anything to unreachable. Only when every attempted
// subsystem fails does the pass itself fail, leaving the table untouched.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use fbxhome_api::models::{HomeNode, LanHost, RaidArray};
use fbxhome_api::network::BRIDGE_MODE_CODE;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::appliance::Appliance;
use crate::convert::{self, DetailsUpdate, Sighting};
use crate::error::{CoreError, PollError};
use crate::model::{
    ApplianceSnapshot, CallRecord, ConnectionInfo, DeviceDetails, DeviceKey, DeviceRecord,
    DiskInfo, HostDetails, MacAddress, NodeState, RaidInfo, Subsystem, SystemInfo,
};
use crate::persist::ConfigStore;
use crate::session::SessionManager;
use crate::store::{DataStore, DeviceTable, SnapshotDelta};

/// How a subsystem fared in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemOutcome {
    Fetched,
    /// Fetch failed; previous values carried forward.
    Stale,
    /// Disabled by capability checks; not attempted.
    Skipped,
}

enum Fetch<T> {
    Fetched(T),
    Stale(fbxhome_api::Error),
    Skipped,
}

impl<T> Fetch<T> {
    fn outcome(&self) -> SubsystemOutcome {
        match self {
            Self::Fetched(_) => SubsystemOutcome::Fetched,
            Self::Stale(_) => SubsystemOutcome::Stale,
            Self::Skipped => SubsystemOutcome::Skipped,
        }
    }

    fn error(&self) -> Option<&fbxhome_api::Error> {
        match self {
            Self::Stale(e) => Some(e),
            _ => None,
        }
    }

    fn fetched(&self) -> Option<&T> {
        match self {
            Self::Fetched(v) => Some(v),
            _ => None,
        }
    }
}

async fn fetch<T>(
    enabled: bool,
    request: impl Future<Output = Result<T, fbxhome_api::Error>>,
) -> Fetch<T> {
    if !enabled {
        return Fetch::Skipped;
    }
    match request.await {
        Ok(value) => Fetch::Fetched(value),
        Err(e) => Fetch::Stale(e),
    }
}

/// Per-subsystem outcomes of a pass.
#[derive(Debug, Clone, Default)]
struct PassOutcomes(BTreeMap<Subsystem, SubsystemOutcome>);

impl PassOutcomes {
    fn get(&self, subsystem: Subsystem) -> SubsystemOutcome {
        self.0
            .get(&subsystem)
            .copied()
            .unwrap_or(SubsystemOutcome::Skipped)
    }

    fn is_fetched(&self, subsystem: Subsystem) -> bool {
        self.get(subsystem) == SubsystemOutcome::Fetched
    }

    fn with(&self, outcome: SubsystemOutcome) -> BTreeSet<Subsystem> {
        self.0
            .iter()
            .filter(|(_, o)| **o == outcome)
            .map(|(s, _)| *s)
            .collect()
    }
}

pub struct Reconciler {
    session: Arc<SessionManager>,
    store: Arc<DataStore>,
    persisted: Arc<ConfigStore>,
    supports_hosts: AtomicBool,
    home_granted: AtomicBool,
    supports_raid: AtomicBool,
}

impl Reconciler {
    pub fn new(
        session: Arc<SessionManager>,
        store: Arc<DataStore>,
        persisted: Arc<ConfigStore>,
    ) -> Self {
        Self {
            session,
            store,
            persisted,
            supports_hosts: AtomicBool::new(true),
            home_granted: AtomicBool::new(true),
            supports_raid: AtomicBool::new(true),
        }
    }

    /// False once the LAN browser reported bridge mode.
    pub fn supports_hosts(&self) -> bool {
        self.supports_hosts.load(Ordering::Acquire)
    }

    /// False once home access was refused.
    pub fn home_granted(&self) -> bool {
        self.home_granted.load(Ordering::Acquire)
    }

    /// False once the RAID listing was refused.
    pub fn supports_raid(&self) -> bool {
        self.supports_raid.load(Ordering::Acquire)
    }

    /// Run one pass.
    #[allow(clippy::too_many_lines)]
    pub async fn reconcile(&self) -> Result<Arc<SnapshotDelta>, PollError> {
        let appliance = self
            .session
            .ensure_open()
            .await
            .map_err(|e| PollError::Unavailable {
                reason: e.to_string(),
            })?;

        let fetched_at = Utc::now();
        let prior_table = self.store.table();
        let prior_snapshot = self.store.snapshot();
        let home = self.home_granted();

        let (system, connection, hosts, stations, nodes, states, wifi, disks, raids, calls) =
            tokio::join!(
                fetch(true, appliance.system_config()),
                fetch(true, appliance.connection_status()),
                fetch(self.supports_hosts(), appliance.lan_hosts()),
                fetch(true, appliance.wifi_stations()),
                fetch(home, appliance.home_nodes()),
                fetch_home_states(appliance.as_ref(), &prior_table, home),
                fetch(true, appliance.wifi_global_config()),
                fetch(true, appliance.storage_disks()),
                fetch(self.supports_raid(), appliance.storage_raids()),
                fetch(true, appliance.call_log()),
            );

        let hosts = self.gate_hosts(hosts);
        let (nodes, states) = self.gate_home(nodes, states);
        let raids = self.gate_raids(raids);

        let outcomes = PassOutcomes(BTreeMap::from([
            (Subsystem::System, system.outcome()),
            (Subsystem::Connection, connection.outcome()),
            (Subsystem::LanHosts, hosts.outcome()),
            (Subsystem::WifiClients, stations.outcome()),
            (Subsystem::HomeNodes, nodes.outcome()),
            (Subsystem::HomeStates, states.outcome()),
            (Subsystem::WifiConfig, wifi.outcome()),
            (Subsystem::Disks, disks.outcome()),
            (Subsystem::Raids, raids.outcome()),
            (Subsystem::CallLog, calls.outcome()),
        ]));

        let errors = [
            (Subsystem::System, system.error()),
            (Subsystem::Connection, connection.error()),
            (Subsystem::LanHosts, hosts.error()),
            (Subsystem::WifiClients, stations.error()),
            (Subsystem::HomeNodes, nodes.error()),
            (Subsystem::HomeStates, states.error()),
            (Subsystem::WifiConfig, wifi.error()),
            (Subsystem::Disks, disks.error()),
            (Subsystem::Raids, raids.error()),
            (Subsystem::CallLog, calls.error()),
        ];
        for (subsystem, err) in &errors {
            if let Some(err) = err {
                let partial = CoreError::PartialFetch {
                    subsystem: *subsystem,
                    message: err.to_string(),
                };
                warn!(error = %partial, "keeping previous values");
                self.session.report_failure(err);
            }
        }

        // A state sweep with nothing to read delivers nothing either.
        let delivered = outcomes.with(SubsystemOutcome::Fetched).len()
            - usize::from(states.fetched().is_some_and(Vec::is_empty));
        let stale = outcomes.with(SubsystemOutcome::Stale);
        if delivered == 0 && !stale.is_empty() {
            let reason = errors
                .iter()
                .find_map(|(_, e)| e.map(ToString::to_string))
                .unwrap_or_else(|| "every subsystem failed".into());
            self.session.mark_failed(reason.clone());
            return Err(PollError::Unavailable { reason });
        }

        // ── Merge, in priority order ─────────────────────────────────
        let inverted = self.persisted.current().inverted_shutters.clone();
        let system_info = system.fetched().map(SystemInfo::from);
        let connection_info = connection.fetched().map(ConnectionInfo::from);

        let mut sightings: Vec<Sighting> = Vec::new();
        if let Some(system) = &system_info {
            sightings.extend(convert::router_sighting(system));
        }
        if let Some(hosts) = hosts.fetched() {
            sightings.extend(hosts.iter().filter_map(convert::host_sighting));
        }
        if let Some(stations) = stations.fetched() {
            sightings.extend(stations.iter().filter_map(convert::station_sighting));
        }
        if let Some(nodes) = nodes.fetched() {
            sightings.extend(nodes.iter().filter_map(|n| convert::node_sighting(n, &inverted)));
        }

        let mut table = DeviceTable::clone(&prior_table);
        let mut merge = PassMerge::new(fetched_at);
        for sighting in sightings {
            merge.apply(&mut table, sighting);
        }

        // Connection enriches the appliance's own record.
        let router_key = system_info
            .as_ref()
            .or_else(|| prior_snapshot.as_ref().and_then(|s| s.system.as_ref()))
            .map(|s| DeviceKey::Mac(MacAddress::new(&s.mac)));
        if let (Some(conn), Some(key)) = (&connection_info, &router_key) {
            if let Some(DeviceDetails::Host(host)) = table.get_mut(key).map(|r| &mut r.details) {
                host.addresses = conn.ipv4.iter().chain(conn.ipv6.iter()).cloned().collect();
            }
        }

        if let Some(states) = states.fetched() {
            apply_node_states(&mut table, states, &inverted);
        }

        merge.finish(&mut table, &outcomes);

        // ── Snapshot ─────────────────────────────────────────────────
        let prior = prior_snapshot.as_deref();
        let snapshot = ApplianceSnapshot {
            fetched_at,
            system: system_info.or_else(|| prior.and_then(|p| p.system.clone())),
            connection: connection_info.or_else(|| prior.and_then(|p| p.connection.clone())),
            hosts: carry(hosts, prior.map(|p| &p.hosts)),
            stations: carry(stations, prior.map(|p| &p.stations)),
            nodes: carry(
                nodes.map_fetched(|nodes| {
                    nodes
                        .into_iter()
                        .filter(|n| n.category.parse::<crate::model::HomeCategory>().is_ok())
                        .collect()
                }),
                prior.map(|p| &p.nodes),
            ),
            node_states: node_states(&table),
            wifi_enabled: wifi
                .fetched()
                .map(|c| c.enabled)
                .or_else(|| prior.and_then(|p| p.wifi_enabled)),
            disks: carry(
                disks.map_fetched(|d| d.iter().map(DiskInfo::from).collect()),
                prior.map(|p| &p.disks),
            ),
            raids: carry(
                raids.map_fetched(|r| r.iter().map(RaidInfo::from).collect()),
                prior.map(|p| &p.raids),
            ),
            calls: carry(
                calls.map_fetched(|c| c.iter().map(CallRecord::from).collect()),
                prior.map(|p| &p.calls),
            ),
            stale: stale.clone(),
            skipped: outcomes.with(SubsystemOutcome::Skipped),
        };

        // ── Delta ────────────────────────────────────────────────────
        let (added, changed, availability) = table.diff(&prior_table);
        let system_changed = match (&snapshot.system, prior.and_then(|p| p.system.as_ref())) {
            (Some(new), Some(old)) => system_identity(new) != system_identity(old),
            (Some(_), None) => true,
            (None, _) => false,
        };
        let delta = SnapshotDelta {
            fetched_at: Some(fetched_at),
            added,
            changed,
            availability,
            stale,
            skipped: snapshot.skipped.clone(),
            system_changed,
        };

        debug!(
            devices = table.len(),
            added = delta.added.len(),
            changed = delta.changed.len(),
            flips = delta.availability.len(),
            stale = delta.stale.len(),
            "pass merged"
        );
        Ok(self.store.publish(table, snapshot, delta))
    }

    /// Bridge mode disables the LAN browser for the rest of the lifetime.
    fn gate_hosts(&self, hosts: Fetch<Vec<LanHost>>) -> Fetch<Vec<LanHost>> {
        match hosts {
            Fetch::Stale(e) if e.api_error_code() == Some(BRIDGE_MODE_CODE) => {
                if self.supports_hosts.swap(false, Ordering::AcqRel) {
                    warn!("appliance is in bridge mode; LAN host tracking disabled");
                }
                Fetch::Skipped
            }
            other => other,
        }
    }

    /// Refused home access disables both home subsystems.
    fn gate_home(
        &self,
        nodes: Fetch<Vec<HomeNode>>,
        states: Fetch<Vec<(u64, Value)>>,
    ) -> (Fetch<Vec<HomeNode>>, Fetch<Vec<(u64, Value)>>) {
        let denied = nodes.error().is_some_and(fbxhome_api::Error::is_permission_denied)
            || states.error().is_some_and(fbxhome_api::Error::is_permission_denied);
        if !denied {
            return (nodes, states);
        }
        if self.home_granted.swap(false, Ordering::AcqRel) {
            warn!("home access not granted to this application; home devices disabled");
        }
        (Fetch::Skipped, Fetch::Skipped)
    }

    /// An appliance that answers the RAID listing with an API error has no
    /// RAID support; stop asking. Transport and session errors stay stale.
    fn gate_raids(&self, raids: Fetch<Vec<RaidArray>>) -> Fetch<Vec<RaidArray>> {
        let Some(reason) = raids
            .error()
            .filter(|e| e.api_error_code().is_some() || e.is_permission_denied())
            .map(ToString::to_string)
        else {
            return raids;
        };
        if self.supports_raid.swap(false, Ordering::AcqRel) {
            warn!(error = %reason, "appliance does not support RAID; RAID tracking disabled");
        }
        Fetch::Skipped
    }

    /// Re-enable subsystems disabled by capability checks (after the
    /// application was granted new rights).
    pub fn reset_capabilities(&self) {
        self.supports_hosts.store(true, Ordering::Release);
        self.home_granted.store(true, Ordering::Release);
        self.supports_raid.store(true, Ordering::Release);
        info!("capability checks reset");
    }
}

impl<T> Fetch<T> {
    fn map_fetched<U>(self, f: impl FnOnce(T) -> U) -> Fetch<U> {
        match self {
            Self::Fetched(v) => Fetch::Fetched(f(v)),
            Self::Stale(e) => Fetch::Stale(e),
            Self::Skipped => Fetch::Skipped,
        }
    }
}

/// Fresh list if fetched, otherwise the previous snapshot's list.
fn carry<T: Clone>(fetched: Fetch<Vec<T>>, prior: Option<&Vec<T>>) -> Vec<T> {
    match fetched {
        Fetch::Fetched(v) => v,
        Fetch::Stale(_) | Fetch::Skipped => prior.cloned().unwrap_or_default(),
    }
}

fn system_identity(info: &SystemInfo) -> (&str, &str, &str, &str) {
    (&info.mac, &info.model, &info.pretty_name, &info.firmware)
}

fn node_states(table: &DeviceTable) -> Vec<(u64, NodeState)> {
    table
        .iter()
        .filter_map(|r| r.node().and_then(|n| n.state.map(|s| (n.node_id, s))))
        .collect()
}

/// Read the state endpoint of every known, reachable stateful node, one
/// at a time. Reads use the previous table; nodes first seen in this pass
/// get their state from the listing itself.
async fn fetch_home_states(
    appliance: &dyn Appliance,
    prior: &DeviceTable,
    enabled: bool,
) -> Fetch<Vec<(u64, Value)>> {
    if !enabled {
        return Fetch::Skipped;
    }
    let targets: Vec<(u64, u64)> = prior
        .iter()
        .filter(|r| r.reachable)
        .filter_map(|r| r.node())
        .filter_map(|n| n.state_endpoint.map(|ep| (n.node_id, ep)))
        .collect();

    let mut values = Vec::with_capacity(targets.len());
    let mut last_error = None;
    for (node_id, endpoint_id) in targets {
        match appliance.home_endpoint_value(node_id, endpoint_id).await {
            Ok(v) => values.push((node_id, v.value)),
            Err(e) => {
                debug!(node_id, endpoint_id, error = %e, "endpoint read failed");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) if values.is_empty() => Fetch::Stale(e),
        _ => Fetch::Fetched(values),
    }
}

fn apply_node_states(table: &mut DeviceTable, states: &[(u64, Value)], inverted: &BTreeSet<u64>) {
    for (node_id, raw) in states {
        let Some(record) = table.get_mut(&DeviceKey::Node(*node_id)) else {
            continue;
        };
        if let DeviceDetails::Node(node) = &mut record.details {
            if let Some(state) = convert::node_state(node.category, raw, inverted.contains(node_id)) {
                node.state = Some(state);
            }
        }
    }
}

// ── Merge bookkeeping ────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SeenInfo {
    sources: BTreeSet<Subsystem>,
    active: bool,
    reported: Option<DateTime<Utc>>,
}

struct PassMerge {
    fetched_at: DateTime<Utc>,
    seen: HashMap<DeviceKey, SeenInfo>,
    named: HashSet<DeviceKey>,
}

impl PassMerge {
    fn new(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            seen: HashMap::new(),
            named: HashSet::new(),
        }
    }

    /// Fold one sighting in. Sightings arrive in priority order: the first
    /// to name a record wins, and later host sightings only fill blanks.
    fn apply(&mut self, table: &mut DeviceTable, sighting: Sighting) {
        let key = sighting.key.clone();
        let info = self.seen.entry(key.clone()).or_default();
        let first_this_pass = info.sources.is_empty();
        info.sources.insert(sighting.source);
        info.active |= sighting.active;
        info.reported = info.reported.max(sighting.reported_seen);

        if table.get(&key).is_none() {
            let details = match &sighting.update {
                DetailsUpdate::Node(node) => DeviceDetails::Node(node.clone()),
                DetailsUpdate::Host { .. } | DetailsUpdate::Wifi { .. } => {
                    DeviceDetails::Host(HostDetails::default())
                }
            };
            table.insert(DeviceRecord {
                key: key.clone(),
                name: key.to_string(),
                last_seen: None,
                reachable: false,
                details,
                sources: BTreeSet::new(),
            });
        }
        let Some(record) = table.get_mut(&key) else {
            return;
        };

        if let Some(name) = sighting.name {
            if self.named.insert(key) {
                record.name = name;
            }
        }

        match sighting.update {
            DetailsUpdate::Host {
                vendor,
                host_type,
                addresses,
            } => {
                if let DeviceDetails::Host(host) = &mut record.details {
                    if first_this_pass || host.vendor.is_empty() {
                        host.vendor = vendor;
                    }
                    if first_this_pass || host.host_type.is_empty() {
                        host.host_type = host_type;
                    }
                    if !addresses.is_empty() {
                        host.addresses = addresses;
                    }
                }
            }
            DetailsUpdate::Wifi { link, vendor } => {
                if let DeviceDetails::Host(host) = &mut record.details {
                    host.wifi = Some(link);
                    if let Some(vendor) = vendor.filter(|_| host.vendor.is_empty()) {
                        host.vendor = vendor;
                    }
                }
            }
            DetailsUpdate::Node(mut fresh) => {
                if let DeviceDetails::Node(old) = &record.details {
                    if fresh.state.is_none() {
                        fresh.state = old.state;
                    }
                }
                record.details = DeviceDetails::Node(fresh);
            }
        }
    }

    /// Reachability, last-seen and listing sources for every record.
    fn finish(self, table: &mut DeviceTable, outcomes: &PassOutcomes) {
        let wifi_fetched = outcomes.is_fetched(Subsystem::WifiClients);
        for record in table.iter_mut() {
            if let Some(info) = self.seen.get(&record.key) {
                record.reachable = info.active;
                record.last_seen = match info.reported {
                    Some(reported) => Some(record.last_seen.map_or(reported, |prev| prev.max(reported))),
                    None if info.active => Some(self.fetched_at),
                    None => record.last_seen,
                };
                let carried: Vec<Subsystem> = record
                    .sources
                    .iter()
                    .copied()
                    .filter(|s| !outcomes.is_fetched(*s))
                    .collect();
                record.sources = info.sources.iter().copied().chain(carried).collect();

                if wifi_fetched && !info.sources.contains(&Subsystem::WifiClients) {
                    if let DeviceDetails::Host(host) = &mut record.details {
                        host.wifi = None;
                    }
                }
            } else if !record.sources.is_empty()
                && record.sources.iter().all(|s| outcomes.is_fetched(*s))
            {
                record.reachable = false;
                if let DeviceDetails::Host(host) = &mut record.details {
                    host.wifi = None;
                }
            }
        }
    }
}
