// Application identity and challenge signing
//
// The appliance authenticates *applications*, not users: an app is
// registered once (the user approves it on the front panel) and receives
// an app token. Each session login answers a fresh challenge with a
// signature derived from that token. Producing the signature is delegated
// to a `ChallengeSigner` so this crate never holds the app token itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// API version segment used for every session call.
pub const API_VERSION: &str = "v6";

/// Identity the application registered with on the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdentity {
    pub app_id: String,
    pub app_name: String,
    pub app_version: String,
    pub device_name: String,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            app_id: "fr.freebox.fbxhome".into(),
            app_name: "fbxhome".into(),
            app_version: env!("CARGO_PKG_VERSION").into(),
            device_name: "fbxhome".into(),
        }
    }
}

/// Answers a login challenge.
///
/// Implementations return the hex-encoded signature of `challenge` keyed
/// by the application token. Signing runs on the caller's runtime, so
/// implementations that wait on I/O must do so asynchronously.
#[async_trait]
pub trait ChallengeSigner: Send + Sync {
    async fn sign(&self, challenge: &str) -> Result<String, Error>;
}

/// Result of `GET login/`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginChallenge {
    #[serde(default)]
    pub logged_in: bool,
    pub challenge: String,
}

/// Result of `POST login/session/`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionGrant {
    pub session_token: String,
    #[serde(default)]
    pub permissions: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST login/session/`.
#[derive(Debug, Serialize)]
pub(crate) struct SessionRequest<'a> {
    pub app_id: &'a str,
    pub app_version: &'a str,
    pub password: String,
}
