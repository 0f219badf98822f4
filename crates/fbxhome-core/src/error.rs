// ── Core error types ──
//
// User-facing errors from fbxhome-core. Consumers never see HTTP status
// codes or envelope error codes directly: the `From<fbxhome_api::Error>`
// impl folds transport-layer errors into the session taxonomy
// (connection vs. transient), and the reconciler and dispatcher add their
// own pass-level and command-level errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::Subsystem;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    /// Authentication or handshake failure. Not retried automatically:
    /// the application must be re-authorized on the appliance.
    #[error("Cannot connect to appliance: {message}")]
    ConnectionError { message: String },

    /// Network-level failure, recovered by the next poll.
    #[error("Transient I/O failure: {message}")]
    TransientIo { message: String },

    // ── Pass errors ──────────────────────────────────────────────────
    /// One subsystem could not be fetched. Absorbed by the pass.
    #[error("Subsystem {subsystem} fetch failed: {message}")]
    PartialFetch { subsystem: Subsystem, message: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error(transparent)]
    Dispatch(DispatchError),

    /// A privileged operation (reboot) failed.
    #[error("Privileged operation failed: {message}")]
    FatalPrivilegedOp { message: String },

    // ── Persistence / configuration ──────────────────────────────────
    #[error("Storage error at {}: {message}", path.display())]
    Storage { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the host should report "setup not ready" rather than retry.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionError { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fbxhome_api::Error> for CoreError {
    fn from(err: fbxhome_api::Error) -> Self {
        use fbxhome_api::Error as Api;
        match err {
            Api::Authentication { message } => CoreError::ConnectionError { message },
            Api::SessionExpired => CoreError::ConnectionError {
                message: "session expired -- re-authentication required".into(),
            },
            Api::InsufficientRights { message } => CoreError::ConnectionError {
                message: format!("insufficient rights: {message}"),
            },
            Api::Tls(message) => CoreError::Config { message },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid appliance URL: {e}"),
            },
            other => CoreError::TransientIo {
                message: other.to_string(),
            },
        }
    }
}

impl From<DispatchError> for CoreError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::FatalPrivilegedOp { message } => CoreError::FatalPrivilegedOp { message },
            other => CoreError::Dispatch(other),
        }
    }
}

// ── Pass errors ──────────────────────────────────────────────────────

/// Failure of a whole reconciliation pass. The device table is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("Appliance unavailable: {reason}")]
    Unavailable { reason: String },
}

// ── Dispatch errors ──────────────────────────────────────────────────

/// Failure of a single command invocation. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No open session (integration not ready, failed, or shut down).
    #[error("Appliance session is not available")]
    Unavailable,

    #[error("Unknown service: {name}")]
    UnknownService { name: String },

    #[error("Invalid remote code {code:?}")]
    InvalidCode { code: String },

    #[error("Repeat count {repeat} exceeds the maximum of {max}")]
    InvalidRepeat { repeat: u64, max: u8 },

    #[error("Invalid field {field:?}: {message}")]
    InvalidField { field: String, message: String },

    /// Remote control was requested but no player is configured.
    #[error("No player remote is configured")]
    NotConfigured,

    /// Some key presses of a repeated command failed. `failed` holds the
    /// 1-based indices of the presses that did not go through.
    #[error("{} of {attempted} key presses failed (presses {failed:?}): {message}", failed.len())]
    Delivery {
        attempted: u32,
        failed: Vec<u32>,
        message: String,
    },

    #[error("Privileged operation failed: {message}")]
    FatalPrivilegedOp { message: String },
}
