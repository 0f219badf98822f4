//! Appliance status summary.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use fbxhome_core::{
    CallRecord, ConnectionInfo, DiskInfo, Integration, IntegrationStatus, RaidInfo, Subsystem,
    SystemInfo,
};
use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusView {
    status: String,
    system: Option<SystemInfo>,
    connection: Option<ConnectionInfo>,
    wifi_enabled: Option<bool>,
    player_remote: bool,
    disks: Vec<DiskInfo>,
    raids: Vec<RaidInfo>,
    missed_calls: Vec<CallRecord>,
    devices: usize,
    reachable: usize,
    stale: BTreeSet<Subsystem>,
    skipped: BTreeSet<Subsystem>,
}

fn status_label(status: &IntegrationStatus) -> String {
    match status {
        IntegrationStatus::Starting => "starting".into(),
        IntegrationStatus::NotReady { reason } => format!("not ready ({reason})"),
        IntegrationStatus::Available => "available".into(),
        IntegrationStatus::Unavailable { reason } => format!("unavailable ({reason})"),
        IntegrationStatus::Stopped => "stopped".into(),
    }
}

fn rate(bytes_per_sec: u64) -> String {
    // Shown in kbit/s as the appliance UI does.
    format!("{} kbit/s", bytes_per_sec.saturating_mul(8) / 1000)
}

fn detail(view: &StatusView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Status:     {}", view.status);
    if let Some(system) = &view.system {
        let _ = writeln!(out, "Model:      {} ({})", system.pretty_name, system.model);
        let _ = writeln!(out, "Firmware:   {}", system.firmware);
        let _ = writeln!(out, "MAC:        {}", system.mac);
        let _ = writeln!(out, "Uptime:     {}s", system.uptime_secs);
        for sensor in &system.sensors {
            let value = sensor.value.map_or_else(|| "-".into(), |v| format!("{v:.1} °C"));
            let _ = writeln!(out, "  {:<24}{value}", sensor.name);
        }
    }
    if let Some(conn) = &view.connection {
        let _ = writeln!(out, "WAN:        {} ({})", conn.state, conn.media);
        let _ = writeln!(out, "IPv4:       {}", conn.ipv4.as_deref().unwrap_or("-"));
        let _ = writeln!(out, "IPv6:       {}", conn.ipv6.as_deref().unwrap_or("-"));
        let _ = writeln!(out, "Rate:       down {} / up {}", rate(conn.rate_down), rate(conn.rate_up));
    }
    if let Some(enabled) = view.wifi_enabled {
        let _ = writeln!(out, "Wi-Fi:      {}", if enabled { "on" } else { "off" });
    }
    let _ = writeln!(
        out,
        "Remote:     {}",
        if view.player_remote { "configured" } else { "none" }
    );
    for disk in &view.disks {
        let temp = disk.temperature.map_or_else(String::new, |t| format!(", {t} °C"));
        let _ = writeln!(out, "Disk:       {} ({}{temp})", disk.model, disk.kind);
        for part in &disk.partitions {
            let free = part.free_percent.map_or_else(|| "-".into(), |p| format!("{p:.2}% free"));
            let _ = writeln!(out, "  {:<24}{free}", part.label);
        }
    }
    for raid in &view.raids {
        let state = if raid.degraded { "degraded" } else { raid.state.as_str() };
        let _ = writeln!(out, "RAID:       {} ({state})", raid.name);
    }
    let _ = writeln!(out, "Missed:     {} new call(s)", view.missed_calls.len());
    for call in &view.missed_calls {
        let when = call.at.map_or_else(|| "-".into(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        let _ = writeln!(out, "  {when}  {}", call.name);
    }
    let _ = write!(out, "Devices:    {} ({} reachable)", view.devices, view.reachable);
    if !view.stale.is_empty() {
        let stale: Vec<String> = view.stale.iter().map(ToString::to_string).collect();
        let _ = write!(out, "\nStale:      {}", stale.join(", "));
    }
    if !view.skipped.is_empty() {
        let skipped: Vec<String> = view.skipped.iter().map(ToString::to_string).collect();
        let _ = write!(out, "\nDisabled:   {}", skipped.join(", "));
    }
    out
}

pub fn handle(integration: &Integration, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = integration.snapshot();
    let table = integration.table();
    let view = StatusView {
        status: status_label(&integration.status()),
        system: snapshot.as_ref().and_then(|s| s.system.clone()),
        connection: snapshot.as_ref().and_then(|s| s.connection.clone()),
        wifi_enabled: snapshot.as_ref().and_then(|s| s.wifi_enabled),
        player_remote: integration.has_remote(),
        disks: snapshot.as_ref().map(|s| s.disks.clone()).unwrap_or_default(),
        raids: snapshot.as_ref().map(|s| s.raids.clone()).unwrap_or_default(),
        missed_calls: snapshot
            .as_ref()
            .map(|s| s.missed_calls().cloned().collect())
            .unwrap_or_default(),
        devices: table.len(),
        reachable: table.reachable_count(),
        stale: snapshot.as_ref().map(|s| s.stale.clone()).unwrap_or_default(),
        skipped: snapshot.as_ref().map(|s| s.skipped.clone()).unwrap_or_default(),
    };
    let rendered = output::render_single(&global.output, &view, detail, |v| v.status.clone())?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
