//! Local state commands (no appliance session).

use fbxhome_core::ConfigStore;

use crate::cli::{GlobalOpts, InvertShutterArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

/// Toggle shutter inversion in the persisted options. Picked up by the
/// next pass of any running integration after its restart.
pub async fn invert_shutter(
    resolved: &Resolved,
    args: &InvertShutterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let store = ConfigStore::new(&resolved.appliance.state_dir);
    store.load().await?;
    let node_id = args.node_id;
    let inverted = !args.off;
    store.update(|config| {
        if inverted {
            config.inverted_shutters.insert(node_id);
        } else {
            config.inverted_shutters.remove(&node_id);
        }
    });
    store.save().await?;

    let state = if inverted { "inverted" } else { "normal" };
    output::print_output(&format!("Shutter {node_id}: {state}"), global.quiet);
    Ok(())
}
