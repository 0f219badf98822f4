// Freebox session API HTTP client
//
// Wraps `reqwest::Client` with versioned URL construction, the
// `{ success, result, error_code, msg }` envelope, and the session token
// header. Endpoint groups (system, network, storage, call, home) are implemented as
// inherent methods in separate files to keep this module focused on
// transport mechanics.

use std::time::Duration;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::auth::{API_VERSION, AppIdentity, ChallengeSigner, LoginChallenge, SessionGrant, SessionRequest};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Header carrying the session token on every authenticated call.
pub const SESSION_HEADER: &str = "X-Fbx-App-Auth";

/// Response envelope shared by every session API call.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    result: Option<T>,
    error_code: Option<String>,
    msg: Option<String>,
}

/// Raw HTTP client for the appliance's session API.
///
/// Holds at most one session token. All endpoint methods return the
/// unwrapped `result` payload -- the envelope is stripped before the caller
/// sees it.
pub struct FreeboxClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    session_token: RwLock<Option<SecretString>>,
}

impl FreeboxClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the appliance root, e.g. `https://mafreebox.freebox.fr:443/`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, transport.timeout))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
            session_token: RwLock::new(None),
        }
    }

    /// Build the appliance root URL from a host and port.
    pub fn endpoint_url(host: &str, port: u16) -> Result<Url, Error> {
        Ok(Url::parse(&format!("https://{host}:{port}/"))?)
    }

    /// The appliance base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a session token is currently held.
    pub async fn is_open(&self) -> bool {
        self.session_token.read().await.is_some()
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Log in with the registered application identity.
    ///
    /// Fetches a fresh challenge, has `signer` answer it, and stores the
    /// resulting session token for subsequent calls.
    pub async fn open(
        &self,
        identity: &AppIdentity,
        signer: &dyn ChallengeSigner,
    ) -> Result<(), Error> {
        let challenge: LoginChallenge = self
            .send(Method::GET, "login/", None::<&()>, false)
            .await?
            .ok_or_else(|| missing_result("login/"))?;

        debug!(logged_in = challenge.logged_in, "received login challenge");

        let request = SessionRequest {
            app_id: &identity.app_id,
            app_version: &identity.app_version,
            password: signer.sign(&challenge.challenge).await?,
        };

        let grant: SessionGrant = self
            .send(Method::POST, "login/session/", Some(&request), false)
            .await
            .map_err(|e| match e {
                Error::Api { code, message } => Error::Authentication {
                    message: format!("{code}: {message}"),
                },
                Error::SessionExpired => Error::Authentication {
                    message: "application token rejected".into(),
                },
                other => other,
            })?
            .ok_or_else(|| missing_result("login/session/"))?;

        debug!(permissions = ?grant.permissions.keys().collect::<Vec<_>>(), "session granted");
        *self.session_token.write().await = Some(SecretString::from(grant.session_token));
        info!(app_id = %identity.app_id, "session opened");
        Ok(())
    }

    /// End the current session. The token is dropped even if the logout
    /// call fails.
    pub async fn close(&self) -> Result<(), Error> {
        if !self.is_open().await {
            return Ok(());
        }
        let result = self
            .send::<serde_json::Value>(Method::POST, "login/logout/", None::<&()>, true)
            .await;
        *self.session_token.write().await = None;
        result.map(|_| ())
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a versioned API path: `{base}api/v6/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{API_VERSION}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request whose envelope must carry a result.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send(Method::GET, path, None::<&()>, true)
            .await?
            .ok_or_else(|| missing_result(path))
    }

    /// Send a GET request for a list. The appliance omits `result` for
    /// empty lists.
    pub(crate) async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        Ok(self
            .send(Method::GET, path, None::<&()>, true)
            .await?
            .unwrap_or_default())
    }

    /// Send a POST request, ignoring any result payload.
    pub(crate) async fn post_empty(&self, path: &str) -> Result<(), Error> {
        self.send::<serde_json::Value>(Method::POST, path, None::<&()>, true)
            .await
            .map(|_| ())
    }

    /// Send a PUT request with a JSON body whose envelope must carry a
    /// result.
    pub(crate) async fn put<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.send(Method::PUT, path, Some(body), true)
            .await?
            .ok_or_else(|| missing_result(path))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
        authenticated: bool,
    ) -> Result<Option<T>, Error> {
        let url = self.api_url(path)?;
        debug!("{} {}", method, url);

        let mut builder = self.http.request(method, url);
        if authenticated {
            let guard = self.session_token.read().await;
            let token = guard.as_ref().ok_or(Error::NotOpen)?;
            builder = builder.header(SESSION_HEADER, token.expose_secret());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                Error::Transport(e)
            }
        })?;

        parse_envelope(resp).await
    }
}

/// Parse the `{ success, result, error_code, msg }` envelope.
///
/// The appliance reports API errors with a 4xx status *and* an envelope,
/// so the body is inspected before the status code.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Option<T>, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(Error::Transport)?;

    let envelope: Envelope<T> = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => {
            return Err(Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body,
            });
        }
        Err(_) => {
            return Err(Error::Http {
                status: status.as_u16(),
                message: preview(&body),
            });
        }
    };

    if envelope.success {
        return Ok(envelope.result);
    }

    let code = envelope.error_code.unwrap_or_else(|| "unknown".into());
    let message = envelope.msg.unwrap_or_default();
    Err(match code.as_str() {
        "auth_required" | "invalid_session" | "invalid_token" => Error::SessionExpired,
        "insufficient_rights" => Error::InsufficientRights { message },
        _ => Error::Api { code, message },
    })
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

fn missing_result(path: &str) -> Error {
    Error::Deserialization {
        message: format!("response to {path} carried no result"),
        body: String::new(),
    }
}
