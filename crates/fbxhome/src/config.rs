//! Profile resolution with CLI flag overrides.

use fbxhome_config::{Profile, load_config, profile_to_appliance_config, signer_command};
use fbxhome_core::ApplianceConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a command needs to reach the appliance.
pub struct Resolved {
    pub profile_name: String,
    pub appliance: ApplianceConfig,
    profile: Profile,
}

impl Resolved {
    /// Signer helper argv; only required by commands that open a session.
    pub fn signer_command(&self) -> Result<Vec<String>, CliError> {
        Ok(signer_command(&self.profile, &self.profile_name)?.to_vec())
    }
}

/// Load the config file, pick the profile and apply flag overrides.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config()?;
    let (profile_name, mut profile) = cfg.profile(global.profile.as_deref())?;

    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if let Some(ref ca) = global.ca_cert {
        profile.ca_cert = Some(ca.clone());
    }

    let appliance = profile_to_appliance_config(&profile, &profile_name, &cfg.defaults)?;
    tracing::debug!(profile = %profile_name, host = %appliance.host, "profile resolved");
    Ok(Resolved {
        profile_name,
        appliance,
        profile,
    })
}
