use thiserror::Error;

/// Top-level error type for the `fbxhome-api` crate.
///
/// Covers every failure mode of the appliance surfaces: the authenticated
/// session API, the player remote-control endpoint, and the transport.
/// `fbxhome-core` maps these into its own failure taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (unknown app, revoked token, bad challenge answer).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The session token was rejected -- a new login is required.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// The application is authenticated but lacks the permission.
    #[error("Insufficient rights: {message}")]
    InsufficientRights { message: String },

    /// A session call was attempted before `open()` succeeded.
    #[error("Session is not open")]
    NotOpen,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Appliance API ───────────────────────────────────────────────
    /// Structured error from the `{success: false, error_code, msg}` envelope.
    #[error("Freebox API error ({code}): {message}")]
    Api { code: String, message: String },

    /// Non-success HTTP status without a parsable envelope.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the session credentials are no
    /// longer valid and a fresh login is needed.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the appliance could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if the application lacks the permission for the call.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::InsufficientRights { .. } => true,
            Self::Api { code, .. } => code == "insufficient_rights",
            _ => false,
        }
    }

    /// Extract the API error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}
