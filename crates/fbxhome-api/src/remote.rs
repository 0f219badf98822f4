// Player remote-control client
//
// The player exposes an unauthenticated key-injection endpoint on the LAN,
// guarded only by the remote code shown in the player's settings. It
// answers plain HTTP and carries no envelope.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::{TlsMode, TransportConfig};

/// Path of the key-injection endpoint on the player.
pub const REMOTE_CONTROL_PATH: &str = "/pub/remote_control";

/// Default player host name on the appliance LAN.
pub const DEFAULT_PLAYER_HOST: &str = "hd1.freebox.fr";

/// Per-request timeout for key presses.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends single key presses to a player.
pub struct RemoteControlClient {
    http: reqwest::Client,
    base_url: Url,
    remote_code: SecretString,
}

impl RemoteControlClient {
    /// Build a client for `host` (optionally `host:port`). Certificate
    /// verification is disabled; the endpoint is LAN-only.
    pub fn new(host: &str, remote_code: SecretString) -> Result<Self, Error> {
        let transport = TransportConfig {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: REMOTE_TIMEOUT,
        };
        let base_url = Url::parse(&format!("http://{host}/"))?;
        Ok(Self::with_client(transport.build_client()?, base_url, remote_code))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, remote_code: SecretString) -> Self {
        Self {
            http,
            base_url,
            remote_code,
        }
    }

    /// Build the key-press URL. The remote code is part of the query, so
    /// the result must never be logged as-is.
    pub(crate) fn key_url(&self, key: &str, long_press: bool) -> Result<Url, Error> {
        let mut url = self.base_url.join(REMOTE_CONTROL_PATH.trim_start_matches('/'))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("code", self.remote_code.expose_secret());
            query.append_pair("key", key);
            if long_press {
                query.append_pair("long", "true");
            }
        }
        Ok(url)
    }

    /// Press one key.
    ///
    /// `GET {base}/pub/remote_control?code={code}&key={key}[&long=true]`
    pub async fn send_key(&self, key: &str, long_press: bool) -> Result<(), Error> {
        let url = self.key_url(key, long_press)?;
        debug!(key, long_press, "GET {}{}", self.base_url, REMOTE_CONTROL_PATH.trim_start_matches('/'));

        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: REMOTE_TIMEOUT.as_secs(),
                }
            } else {
                Error::Transport(e)
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: "player rejected the remote code".into(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }
        Ok(())
    }
}
