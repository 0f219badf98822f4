//! Command dispatch: validates inputs, connects, runs the handler, and
//! always shuts the integration down afterwards.

pub mod devices;
pub mod remote;
pub mod status;
pub mod system;
pub mod watch;

use std::sync::Arc;

use fbxhome_core::{DeviceRegistry, Integration, MemoryRegistry};

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::signer::CommandSigner;

pub async fn dispatch(cmd: Command, resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    // Commands that never talk to the appliance.
    if let Command::InvertShutter(args) = cmd {
        return system::invert_shutter(resolved, &args, global).await;
    }

    // Reject bad commands before any network traffic.
    let call = match &cmd {
        Command::Remote(_)
        | Command::Power(_)
        | Command::Play(_)
        | Command::Reboot
        | Command::Wifi(_) => {
            Some(remote::service_call(&cmd, global)?)
        }
        _ => None,
    };

    let integration = connect(resolved).await?;
    let result = match (cmd, call) {
        (Command::Watch, _) => watch::handle(&integration, global).await,
        (Command::Devices(args), _) => devices::handle(&integration, &args, global),
        (Command::Status, _) => status::handle(&integration, global),
        (_, Some(call)) => remote::execute(&integration, call, global).await,
        (other, None) => Err(CliError::Internal(format!("unhandled command {other:?}"))),
    };
    integration.shutdown().await;
    result
}

/// Build and start the integration for `resolved`.
async fn connect(resolved: &Resolved) -> Result<Integration, CliError> {
    let signer = Arc::new(CommandSigner::new(resolved.signer_command()?));
    let registry: Arc<dyn DeviceRegistry> = Arc::new(MemoryRegistry::new());
    let integration = Integration::connect_http(resolved.appliance.clone(), signer, registry)?;
    if let Err(e) = integration.start().await {
        integration.shutdown().await;
        return Err(e.into());
    }
    Ok(integration)
}
