// ── Core error types ──
//
// Domain errors from projectlink-core. Consumers never see reqwest errors
// or JSON parse failures directly: the `From<projectlink_api::Error>` impl
// translates transport-layer errors into these variants.

use thiserror::Error;

use crate::event_bus::EventBusError;
use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Caller misuse ────────────────────────────────────────────────
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Invalid API path: {path:?}")]
    InvalidPath { path: String },

    #[error("Invalid event name: {name}")]
    InvalidEventName { name: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("No reachable box origin is known")]
    NoOrigin,

    #[error("Network failure talking to {url}: {reason}")]
    NetworkFailure { url: String, reason: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Session rejected by the box")]
    Unauthorized,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed service record: {message}")]
    MalformedService { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EventBusError> for CoreError {
    fn from(err: EventBusError) -> Self {
        match err {
            EventBusError::InvalidEventName { name } => CoreError::InvalidEventName { name },
            EventBusError::InvalidArgument { message } => CoreError::InvalidArgument { message },
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<projectlink_api::Error> for CoreError {
    fn from(err: projectlink_api::Error) -> Self {
        use projectlink_api::Error as ApiError;

        match err {
            ApiError::Transport(ref e) => {
                let url = e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string);
                if e.is_timeout() {
                    CoreError::Timeout { timeout_ms: 0 }
                } else if let Some(status) = e.status() {
                    CoreError::Api {
                        message: e.to_string(),
                        status: Some(status.as_u16()),
                    }
                } else {
                    CoreError::NetworkFailure {
                        url,
                        reason: e.to_string(),
                    }
                }
            }
            ApiError::Status { status: 401, .. } => CoreError::Unauthorized,
            ApiError::Status { status, url, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status} from {url}")
                } else {
                    format!("HTTP {status} from {url}: {body}")
                },
                status: Some(status),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            ApiError::Tls(msg) => CoreError::NetworkFailure {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            ApiError::Discovery { message } => CoreError::NetworkFailure {
                url: String::new(),
                reason: message,
            },
        }
    }
}
