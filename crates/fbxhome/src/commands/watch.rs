//! Long-running sync loop.

use std::sync::Arc;

use fbxhome_core::{DeviceKey, Integration, IntegrationStatus, SnapshotDelta};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

fn describe(integration: &Integration, delta: &SnapshotDelta, color: bool) -> Vec<String> {
    let table = integration.table();
    let name = |key: &DeviceKey| table.get(key).map_or_else(|| "?".to_owned(), |r| r.name.clone());

    let mut lines = Vec::new();
    for key in &delta.added {
        lines.push(format!("+ {} [{key}]", name(key)));
    }
    for key in &delta.changed {
        lines.push(format!("~ {} [{key}]", name(key)));
    }
    for flip in &delta.availability {
        lines.push(format!(
            "  {} [{}] is {}",
            name(&flip.key),
            flip.key,
            output::reachability(flip.reachable, color)
        ));
    }
    if delta.system_changed {
        lines.push("  appliance identity or firmware changed".into());
    }
    if !delta.stale.is_empty() {
        let stale: Vec<String> = delta.stale.iter().map(ToString::to_string).collect();
        lines.push(format!("! stale this pass: {}", stale.join(", ")));
    }
    lines
}

fn print_delta(integration: &Integration, delta: &Arc<SnapshotDelta>, global: &GlobalOpts) -> Result<(), CliError> {
    match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            output::print_output(&serde_json::to_string(delta.as_ref())?, global.quiet);
        }
        OutputFormat::Yaml => {
            output::print_output(&format!("---\n{}", serde_yaml::to_string(delta.as_ref())?), global.quiet);
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let color = output::should_color(&global.color);
            for line in describe(integration, delta, color) {
                output::print_output(&line, global.quiet);
            }
        }
    }
    Ok(())
}

pub async fn handle(integration: &Integration, global: &GlobalOpts) -> Result<(), CliError> {
    let mut deltas = integration.subscribe_deltas();
    let mut status = integration.subscribe_status();

    let table = integration.table();
    output::print_output(
        &format!(
            "Watching {} ({} devices, {} reachable); Ctrl-C to stop",
            integration.config().host,
            table.len(),
            table.reachable_count()
        ),
        global.quiet,
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                match current {
                    IntegrationStatus::Unavailable { reason } => warn!(%reason, "appliance unavailable"),
                    IntegrationStatus::Available => info!("appliance available"),
                    _ => {}
                }
            }
            delta = deltas.recv() => match delta {
                Ok(delta) => print_delta(integration, &delta, global)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "watcher fell behind; some deltas were dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
