// ── Runtime link configuration ──
//
// Describes how to find and talk to a box. Never touches disk: the CLI
// (or any host) builds a `LinkConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use projectlink_api::TransportConfig;
use projectlink_api::transport::TlsMode;
use url::Url;

use crate::settings::SettingsSnapshot;

/// Public registration service boxes announce themselves to.
pub const DEFAULT_REGISTRATION_URL: &str = "https://knilxof.org:4443/ping";

pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_DISCOVERY_RETRY: Duration = Duration::from_millis(1000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (boxes on the local network are self-signed).
    DangerAcceptInvalid,
}

impl TlsVerification {
    fn to_transport(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Registration-service lookup tuning.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub registration_url: Url,
    /// Bound on a single registration-service request.
    pub timeout: Duration,
    /// Delay before retrying after a failed or empty lookup.
    pub retry: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            registration_url: default_registration_url(),
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
            retry: DEFAULT_DISCOVERY_RETRY,
        }
    }
}

/// Everything needed to build a [`crate::Link`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub discovery: DiscoveryConfig,
    pub tls: TlsVerification,
    pub request_timeout: Duration,
    /// Initial settings, usually restored from a state file.
    pub settings: SettingsSnapshot,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            tls: TlsVerification::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            settings: SettingsSnapshot::default(),
        }
    }
}

impl LinkConfig {
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_transport(),
            timeout: Some(self.request_timeout),
        }
    }
}

fn default_registration_url() -> Url {
    Url::parse(DEFAULT_REGISTRATION_URL).expect("default registration URL is valid")
}
