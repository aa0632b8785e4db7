//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use projectlink_config::ConfigError;
use projectlink_core::{CoreError, StoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the box at {url}: {reason}")]
    #[diagnostic(
        code(projectlink::connection_failed),
        help("Check that the box is powered on, or pass its address with --origin.")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("No box origin is known")]
    #[diagnostic(
        code(projectlink::no_origin),
        help(
            "Run: projectlink discover\n\
             Or pass the box address with --origin."
        )
    )]
    NoOrigin,

    #[error("The box is offline")]
    #[diagnostic(
        code(projectlink::offline),
        help("Neither the local nor the tunnel origin answered /ping.")
    )]
    Offline,

    // ── Authentication ───────────────────────────────────────────────
    #[error("The box rejected the session for profile '{profile}'")]
    #[diagnostic(
        code(projectlink::unauthorized),
        help(
            "Pass a fresh token with --session,\n\
             or set PROJECTLINK_SESSION."
        )
    )]
    Unauthorized { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(projectlink::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("The box reported an error: {message}")]
    #[diagnostic(code(projectlink::api_error))]
    Api { message: String, status: Option<u16> },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(projectlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(projectlink::profile_not_found),
        help("Run: projectlink config show   to list configured profiles")
    )]
    ProfileNotFound { name: String },

    #[error(transparent)]
    #[diagnostic(code(projectlink::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Gave up after {seconds}s")]
    #[diagnostic(
        code(projectlink::timeout),
        help("Increase the wait with --timeout, or check that a session is configured.")
    )]
    Timeout { seconds: u64 },

    // ── Everything else ──────────────────────────────────────────────
    #[error(transparent)]
    Core(CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(projectlink::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NoOrigin | Self::Offline => exit_code::CONNECTION,
            Self::Unauthorized { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::Api { status: Some(404), .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NetworkFailure { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::NoOrigin => CliError::NoOrigin,

            CoreError::Unauthorized => CliError::Unauthorized {
                profile: "current".into(),
            },

            CoreError::Timeout { timeout_ms } => CliError::Timeout {
                seconds: timeout_ms.div_ceil(1000),
            },

            CoreError::Api { message, status } => CliError::Api { message, status },

            CoreError::InvalidArgument { message } => CliError::Validation {
                field: "argument".into(),
                reason: message,
            },

            CoreError::InvalidPath { path } => CliError::Validation {
                field: "path".into(),
                reason: format!("{path:?} is not a valid API path"),
            },

            CoreError::Store(StoreError::UnknownStore { name }) => CliError::NotFound {
                resource_type: "store".into(),
                identifier: name,
            },

            other => CliError::Core(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound { name: profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::NoOrigin, exit_code::CONNECTION),
            (CoreError::Unauthorized, exit_code::AUTH),
            (CoreError::Timeout { timeout_ms: 1500 }, exit_code::TIMEOUT),
            (
                CoreError::InvalidPath { path: String::new() },
                exit_code::USAGE,
            ),
            (
                CoreError::Api {
                    message: "boom".into(),
                    status: Some(500),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn timeout_rounds_up_to_whole_seconds() {
        let err = CliError::from(CoreError::Timeout { timeout_ms: 1500 });
        assert!(matches!(err, CliError::Timeout { seconds: 2 }));
    }

    #[test]
    fn unknown_profile_is_a_usage_error() {
        let err = CliError::from(ConfigError::UnknownProfile {
            profile: "attic".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("attic"));
    }
}
