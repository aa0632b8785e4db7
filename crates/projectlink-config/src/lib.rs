//! Shared configuration for Project Link tools.
//!
//! TOML profiles, session token resolution (env + keyring + plaintext),
//! a JSON state file that keeps the session and selected box across runs,
//! and translation to `projectlink_core::LinkConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use projectlink_core::{DiscoveryConfig, LinkConfig, SettingsSnapshot, TlsVerification};

const KEYRING_SERVICE: &str = "projectlink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("state file is corrupt: {0}")]
    State(#[from] serde_json::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named box profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The profile to use: `requested`, else `default_profile`.
    ///
    /// A missing default profile is not an error (everything can come from
    /// flags and the state file); a missing requested one is.
    pub fn profile<'a>(&'a self, requested: Option<&'a str>) -> Result<(&'a str, Option<&'a Profile>), ConfigError> {
        match requested {
            Some(name) => self
                .profiles
                .get(name)
                .map(|p| (name, Some(p)))
                .ok_or_else(|| ConfigError::UnknownProfile {
                    profile: name.into(),
                }),
            None => {
                let name = self.default_profile.as_deref().unwrap_or("default");
                Ok((name, self.profiles.get(name)))
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_registration_url")]
    pub registration_url: String,

    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    #[serde(default = "default_discovery_retry_ms")]
    pub discovery_retry_ms: u64,

    #[serde(default = "default_api_version")]
    pub api_version: u32,

    #[serde(default = "default_service_polling_ms")]
    pub service_polling_ms: u64,

    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,

    #[serde(default = "default_online_check_ms")]
    pub online_check_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub insecure: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            registration_url: default_registration_url(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            discovery_retry_ms: default_discovery_retry_ms(),
            api_version: default_api_version(),
            service_polling_ms: default_service_polling_ms(),
            watch_interval_ms: default_watch_interval_ms(),
            online_check_ms: default_online_check_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            insecure: false,
        }
    }
}

fn default_registration_url() -> String {
    projectlink_core::config::DEFAULT_REGISTRATION_URL.into()
}
fn default_discovery_timeout_ms() -> u64 {
    5000
}
fn default_discovery_retry_ms() -> u64 {
    1000
}
fn default_api_version() -> u32 {
    1
}
fn default_service_polling_ms() -> u64 {
    2000
}
fn default_watch_interval_ms() -> u64 {
    3000
}
fn default_online_check_ms() -> u64 {
    5000
}
fn default_request_timeout_secs() -> u64 {
    30
}

/// A named box profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Box origin on the local network (e.g. "http://192.168.1.20:3000").
    pub local_origin: Option<String>,

    /// Box origin through the remote tunnel.
    pub tunnel_origin: Option<String>,

    /// Preferred box when several are registered.
    pub client_id: Option<String>,

    /// Use the configured origins as-is, never asking the registration service.
    pub skip_discovery: Option<bool>,

    /// Session token (plaintext; prefer keyring or env var).
    pub session: Option<String>,

    /// Environment variable name containing the session token.
    pub session_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "projectlink", "projectlink")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("projectlink");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the persisted settings state lives.
pub fn state_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + `PROJECTLINK_` environment variables.
///
/// Nested keys use a double underscore: `PROJECTLINK_DEFAULTS__API_VERSION=2`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PROJECTLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Persisted state ─────────────────────────────────────────────────

/// JSON file holding the last [`SettingsSnapshot`].
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The state file at the platform default location.
    pub fn default_location() -> Self {
        Self::new(state_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; a missing file yields defaults.
    pub fn load(&self) -> Result<SettingsSnapshot, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsSnapshot::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the snapshot. The session token is never written; it stays
    /// with the env var, keyring, or profile it came from.
    pub fn save(&self, snapshot: &SettingsSnapshot) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = SettingsSnapshot {
            session: None,
            ..snapshot.clone()
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

// ── Session resolution ──────────────────────────────────────────────

/// Resolve a session token: profile env var, then keyring, then plaintext.
pub fn resolve_session(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's session_env → env var lookup
    if let Some(ref env_name) = profile.session_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile.session.clone().map(SecretString::from)
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/session")
}

// ── LinkConfig translation ──────────────────────────────────────────

fn parse_origin(field: &str, value: &str) -> Result<Url, ConfigError> {
    value.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {value}"),
    })
}

/// Build a `LinkConfig` from global defaults, an optional profile, and
/// the persisted state.
///
/// Intervals and API version come from the config; the selected box comes
/// from the profile when it sets one, else from `state`. The session comes
/// from the profile's credential chain.
pub fn profile_to_link_config(
    config: &Config,
    profile: Option<&Profile>,
    profile_name: &str,
    state: SettingsSnapshot,
) -> Result<LinkConfig, ConfigError> {
    let defaults = &config.defaults;
    let mut settings = SettingsSnapshot {
        api_version: defaults.api_version,
        service_polling_ms: defaults.service_polling_ms,
        watch_interval_ms: defaults.watch_interval_ms,
        online_check_ms: defaults.online_check_ms,
        ..state
    };

    let mut tls = if defaults.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };

    if let Some(profile) = profile {
        if let Some(ref origin) = profile.local_origin {
            settings.local_origin = Some(parse_origin("local_origin", origin)?);
        }
        if let Some(ref origin) = profile.tunnel_origin {
            settings.tunnel_origin = Some(parse_origin("tunnel_origin", origin)?);
        }
        if profile.client_id.is_some() {
            settings.client_id.clone_from(&profile.client_id);
        }
        if let Some(skip) = profile.skip_discovery {
            settings.skip_discovery = skip;
        }
        if let Some(session) = resolve_session(profile, profile_name) {
            settings.session = Some(session.expose_secret().to_owned());
        }

        if profile.insecure.unwrap_or(false) {
            tls = TlsVerification::DangerAcceptInvalid;
        } else if let Some(ref ca_path) = profile.ca_cert {
            tls = TlsVerification::CustomCa(ca_path.clone());
        }
    }

    Ok(LinkConfig {
        discovery: DiscoveryConfig {
            registration_url: parse_origin("registration_url", &defaults.registration_url)?,
            timeout: Duration::from_millis(defaults.discovery_timeout_ms),
            retry: Duration::from_millis(defaults.discovery_retry_ms),
        },
        tls,
        request_timeout: Duration::from_secs(defaults.request_timeout_secs),
        settings,
    })
}
