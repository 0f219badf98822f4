//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with help text.

use miette::Diagnostic;
use thiserror::Error;

use fbxhome_config::ConfigError;
use fbxhome_core::{CoreError, DispatchError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the appliance: {reason}")]
    #[diagnostic(
        code(fbxhome::connection_failed),
        help(
            "Check that the appliance is reachable from this host.\n\
             Try: fbxhome status -v"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Appliance session unavailable")]
    #[diagnostic(
        code(fbxhome::unavailable),
        help("The session was lost. Retry the command.")
    )]
    Unavailable,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(fbxhome::auth_failed),
        help(
            "Check that the application is authorized on the appliance\n\
             (Freebox OS > Settings > Access management) and that\n\
             signer_command answers challenges with the right token."
        )
    )]
    AuthFailed { message: String },

    #[error("No signer configured for profile '{profile}'")]
    #[diagnostic(
        code(fbxhome::no_signer),
        help(
            "Set signer_command in the profile, e.g.\n\
             signer_command = [\"fbx-sign\", \"--token-file\", \"/path/to/token\"]"
        )
    )]
    NoSigner { profile: String },

    // ── Commands ─────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(fbxhome::rejected),
        help("See `fbxhome remote --help` for accepted codes and limits.")
    )]
    Rejected { message: String },

    #[error("No player remote is configured")]
    #[diagnostic(
        code(fbxhome::no_remote),
        help("Set remote_host and remote_code (or remote_code_env) in the profile.")
    )]
    NoRemote,

    #[error("{message}")]
    #[diagnostic(code(fbxhome::delivery))]
    Delivery { message: String },

    #[error("Appliance operation failed: {message}")]
    #[diagnostic(
        code(fbxhome::operation_failed),
        help("Check the appliance before retrying. It may still be restarting.")
    )]
    OperationFailed { message: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(fbxhome::confirmation_required),
        help("Use --yes (-y) to confirm.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fbxhome::validation))]
    Validation { field: String, reason: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fbxhome::profile_not_found),
        help("Expected under [profiles.{name}] in {path}")
    )]
    ProfileNotFound { name: String, path: String },

    #[error("Stored state at {path} is unusable: {message}")]
    #[diagnostic(
        code(fbxhome::storage),
        help("Fix or remove the file; it is recreated on the next clean shutdown.")
    )]
    Storage { path: String, message: String },

    #[error(transparent)]
    #[diagnostic(code(fbxhome::config))]
    Config(Box<ConfigError>),

    #[error("Internal error: {0}")]
    #[diagnostic(code(fbxhome::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Unavailable => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoSigner { .. } => exit_code::AUTH,
            Self::Rejected { .. }
            | Self::NoRemote
            | Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionError { message } => Self::AuthFailed { message },
            CoreError::TransientIo { message } => Self::ConnectionFailed { reason: message },
            CoreError::PartialFetch { subsystem, message } => Self::ConnectionFailed {
                reason: format!("{subsystem}: {message}"),
            },
            CoreError::Dispatch(err) => err.into(),
            CoreError::FatalPrivilegedOp { message } => Self::OperationFailed { message },
            CoreError::Storage { path, message } => Self::Storage {
                path: path.display().to_string(),
                message,
            },
            CoreError::Config { message } => Self::Validation {
                field: "appliance".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<DispatchError> for CliError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Unavailable => Self::Unavailable,
            DispatchError::NotConfigured => Self::NoRemote,
            DispatchError::Delivery { .. } => Self::Delivery {
                message: err.to_string(),
            },
            DispatchError::FatalPrivilegedOp { message } => Self::OperationFailed { message },
            DispatchError::UnknownService { .. }
            | DispatchError::InvalidCode { .. }
            | DispatchError::InvalidRepeat { .. }
            | DispatchError::InvalidField { .. } => Self::Rejected {
                message: err.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                path: fbxhome_config::config_path().display().to_string(),
            },
            ConfigError::NoSigner { profile } => Self::NoSigner { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::MissingRemoteCode { .. } => Self::Validation {
                field: "remote_code".into(),
                reason: err.to_string(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}
