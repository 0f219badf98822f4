//! Configuration for the fbxhome CLI and other hosts.
//!
//! TOML profiles, secret resolution (env var or plaintext) and translation
//! to `fbxhome_core::ApplianceConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fbxhome_api::AppIdentity;
use fbxhome_core::{ApplianceConfig, RemoteConfig, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' is not defined")]
    UnknownProfile { name: String },

    #[error("profile '{profile}' sets remote_host but no remote code")]
    MissingRemoteCode { profile: String },

    #[error("profile '{profile}' has no signer_command")]
    NoSigner { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named appliance profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, falling back to the default profile. A missing
    /// `default` profile resolves to built-in settings.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        let name = name
            .map(ToOwned::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile.clone())),
            None if name == "default" => Ok((name, Profile::default())),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Poll period, humantime syntax ("40s", "2m").
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_poll_interval() -> String {
    "40s".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named appliance profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Appliance host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application id registered on the appliance.
    pub app_id: Option<String>,

    pub app_name: Option<String>,

    pub device_name: Option<String>,

    /// Helper that signs login challenges: argv, challenge on stdin,
    /// hex signature on stdout.
    #[serde(default)]
    pub signer_command: Vec<String>,

    /// Path to the appliance root CA. Without it, certificates are not
    /// verified (the appliance certificate is self-signed).
    pub ca_cert: Option<PathBuf>,

    /// Verify against the system CA store.
    #[serde(default)]
    pub verify_tls: bool,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override poll period (humantime).
    pub poll_interval: Option<String>,

    /// Where persisted options live. Defaults to the platform data dir.
    pub state_dir: Option<PathBuf>,

    /// Player host for remote-control commands.
    pub remote_host: Option<String>,

    /// Remote code (plaintext; prefer `remote_code_env`).
    pub remote_code: Option<String>,

    /// Environment variable holding the remote code.
    pub remote_code_env: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            app_id: None,
            app_name: None,
            device_name: None,
            signer_command: Vec::new(),
            ca_cert: None,
            verify_tls: false,
            timeout: None,
            poll_interval: None,
            state_dir: None,
            remote_host: None,
            remote_code: None,
            remote_code_env: None,
        }
    }
}

fn default_host() -> String {
    "mafreebox.freebox.fr".into()
}
fn default_port() -> u16 {
    443
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("fr", "fbxhome", "fbxhome")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory for persisted integration state.
pub fn default_state_dir(profile_name: &str) -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state").join(profile_name),
        |dirs| dirs.data_dir().join(profile_name),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fbxhome");
    p
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields defaults.
///
/// Environment overrides use `FBXHOME_` and `__` as the nesting separator,
/// e.g. `FBXHOME_PROFILES__HOME__HOST`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FBXHOME_").split("__"));

    Ok(figment.extract()?)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret resolution ───────────────────────────────────────────────

/// Resolve the player remote code: the profile's env var first, then the
/// plaintext value.
pub fn resolve_remote_code(profile: &Profile) -> Option<SecretString> {
    if let Some(ref env_name) = profile.remote_code_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }
    profile.remote_code.clone().map(SecretString::from)
}

/// The signer helper argv, validated non-empty.
pub fn signer_command<'a>(profile: &'a Profile, profile_name: &str) -> Result<&'a [String], ConfigError> {
    if profile.signer_command.is_empty() {
        return Err(ConfigError::NoSigner {
            profile: profile_name.into(),
        });
    }
    Ok(&profile.signer_command)
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    let duration = humantime::parse_duration(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("{raw:?}: {e}"),
    })?;
    if duration.is_zero() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(duration)
}

// ── Translation ─────────────────────────────────────────────────────

/// Build an `ApplianceConfig` from a profile and the global defaults.
pub fn profile_to_appliance_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ApplianceConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }
    if profile.port == 0 {
        return Err(ConfigError::Validation {
            field: "port".into(),
            reason: "must not be 0".into(),
        });
    }

    let tls = if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else if profile.verify_tls {
        TlsVerification::SystemDefaults
    } else {
        TlsVerification::DangerAcceptInvalid
    };

    let poll_interval = parse_duration(
        "poll_interval",
        profile.poll_interval.as_deref().unwrap_or(&defaults.poll_interval),
    )?;
    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    let remote = match &profile.remote_host {
        Some(host) => {
            let code = resolve_remote_code(profile).ok_or_else(|| ConfigError::MissingRemoteCode {
                profile: profile_name.into(),
            })?;
            Some(RemoteConfig {
                host: host.clone(),
                code,
            })
        }
        None => None,
    };

    let base = AppIdentity::default();
    let identity = AppIdentity {
        app_id: profile.app_id.clone().unwrap_or(base.app_id),
        app_name: profile.app_name.clone().unwrap_or(base.app_name),
        app_version: base.app_version,
        device_name: profile.device_name.clone().unwrap_or(base.device_name),
    };

    let config = ApplianceConfig {
        host: profile.host.clone(),
        port: profile.port,
        identity,
        tls,
        timeout,
        poll_interval,
        state_dir: profile
            .state_dir
            .clone()
            .unwrap_or_else(|| default_state_dir(profile_name)),
        remote,
    };
    config.base_url().map_err(|e| ConfigError::Validation {
        field: "host".into(),
        reason: e.to_string(),
    })?;
    Ok(config)
}
