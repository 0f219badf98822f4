//! Device listing.

use chrono::Utc;
use fbxhome_core::{
    AlarmState, DeviceDetails, DeviceKind, DeviceRecord, Integration, NodeState,
};
use tabled::Tabled;

use crate::cli::{DevicesArgs, GlobalOpts, KindFilter};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Details")]
    details: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
}

fn node_state(state: Option<NodeState>) -> String {
    match state {
        None => "-".into(),
        Some(NodeState::Alarm { state }) => match state {
            AlarmState::Arming => "arming".into(),
            AlarmState::ArmedAway => "armed (away)".into(),
            AlarmState::ArmedHome => "armed (home)".into(),
            AlarmState::Triggered => "TRIGGERED".into(),
            AlarmState::Disarmed => "disarmed".into(),
        },
        Some(NodeState::Camera { detection: true }) => "detection on".into(),
        Some(NodeState::Camera { detection: false }) => "detection off".into(),
        Some(NodeState::Shutter { position }) => format!("{position}% open"),
        Some(NodeState::BasicShutter { closed: true }) => "closed".into(),
        Some(NodeState::BasicShutter { closed: false }) => "open".into(),
    }
}

fn details(record: &DeviceRecord) -> String {
    match &record.details {
        DeviceDetails::Host(host) => {
            let mut parts = vec![host.host_type.clone(), host.vendor.clone()];
            if let Some(addr) = host.addresses.first() {
                parts.push(addr.clone());
            }
            if let Some(signal) = host.wifi.as_ref().and_then(|w| w.signal) {
                parts.push(format!("{signal} dBm"));
            }
            parts.retain(|p| !p.is_empty());
            parts.join(", ")
        }
        DeviceDetails::Node(node) => format!("{} ({}), {}", node.model, node.manufacturer, node_state(node.state)),
    }
}

fn ago(record: &DeviceRecord) -> String {
    let Some(seen) = record.last_seen else {
        return "-".into();
    };
    let secs = (Utc::now() - seen).num_seconds().max(0);
    match secs {
        0..60 => format!("{secs}s ago"),
        60..3600 => format!("{}m ago", secs / 60),
        3600..86_400 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

pub fn handle(integration: &Integration, args: &DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let table = integration.table();
    let records: Vec<DeviceRecord> = table
        .iter()
        .filter(|r| !args.reachable || r.reachable)
        .filter(|r| match args.kind {
            None => true,
            Some(KindFilter::Host) => r.kind() == DeviceKind::Host,
            Some(KindFilter::Node) => r.kind() == DeviceKind::Node,
        })
        .cloned()
        .collect();

    let color = output::should_color(&global.color);
    let rendered = output::render_list(
        &global.output,
        &records,
        |r| DeviceRow {
            key: r.key.to_string(),
            name: r.name.clone(),
            kind: r.kind().to_string(),
            state: output::reachability(r.reachable, color),
            details: details(r),
            last_seen: ago(r),
        },
        |r| r.key.to_string(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
