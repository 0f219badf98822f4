// ── Runtime appliance configuration ──
//
// These types describe *how* to reach one appliance and how often to poll
// it. They carry identity and tuning data but never touch config files:
// the CLI (via fbxhome-config) builds an `ApplianceConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use fbxhome_api::AppIdentity;
use fbxhome_api::transport::{TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Default poll period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(40);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file (the appliance root bundle).
    CustomCa(PathBuf),
    /// Skip verification. Default: the appliance certificate is self-signed.
    #[default]
    DangerAcceptInvalid,
}

/// Player remote-control settings.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Player host, optionally with `:port`.
    pub host: String,
    /// Remote code from the player's network settings.
    pub code: SecretString,
}

/// Configuration for one appliance.
#[derive(Debug, Clone)]
pub struct ApplianceConfig {
    pub host: String,
    pub port: u16,
    pub identity: AppIdentity,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Period of the background poll.
    pub poll_interval: Duration,
    /// Directory holding the persisted integration state.
    pub state_dir: PathBuf,
    pub remote: Option<RemoteConfig>,
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            host: "mafreebox.freebox.fr".into(),
            port: 443,
            identity: AppIdentity::default(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            poll_interval: DEFAULT_POLL_INTERVAL,
            state_dir: PathBuf::from("."),
            remote: None,
        }
    }
}

impl ApplianceConfig {
    /// Appliance root URL, `https://{host}:{port}/`.
    pub fn base_url(&self) -> Result<Url, CoreError> {
        Url::parse(&self.configuration_url()).map_err(|e| CoreError::Config {
            message: format!("invalid appliance address {}:{}: {e}", self.host, self.port),
        })
    }

    /// URL of the appliance's own admin UI.
    pub fn configuration_url(&self) -> String {
        format!("https://{}:{}/", self.host, self.port)
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
