// ── Settings store ──
//
// Runtime configuration shared by every component: session token, box
// origins, API version, and polling intervals. Each property emits its own
// change event, only when the value actually changes. Persistence is the
// caller's concern: `snapshot()` / `restore()` move plain data in and out.

use std::sync::RwLock;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::event_bus::{EventBus, EventBusError};
use crate::readiness::wait_until;

// ── Event names ──────────────────────────────────────────────────────

pub const SESSION: &str = "session";
pub const LOCAL_ORIGIN: &str = "local-origin";
pub const TUNNEL_ORIGIN: &str = "tunnel-origin";
pub const CLIENT_ID: &str = "client-id";
pub const API_VERSION: &str = "api-version";
pub const SERVICE_POLLING_INTERVAL: &str = "service-polling-interval";
pub const WATCH_INTERVAL: &str = "watch-interval";
pub const ONLINE_CHECK_INTERVAL: &str = "online-check-interval";
pub const SKIP_DISCOVERY: &str = "skip-discovery";

const EVENTS: &[&str] = &[
    SESSION,
    LOCAL_ORIGIN,
    TUNNEL_ORIGIN,
    CLIENT_ID,
    API_VERSION,
    SERVICE_POLLING_INTERVAL,
    WATCH_INTERVAL,
    ONLINE_CHECK_INTERVAL,
    SKIP_DISCOVERY,
];

// ── Defaults ─────────────────────────────────────────────────────────

pub const DEFAULT_API_VERSION: u32 = 1;
pub const DEFAULT_SERVICE_POLLING_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_ONLINE_CHECK_INTERVAL: Duration = Duration::from_millis(5000);

/// Plain-data view of every setting, used for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub local_origin: Option<Url>,
    pub tunnel_origin: Option<Url>,
    pub client_id: Option<String>,
    pub api_version: u32,
    pub service_polling_ms: u64,
    pub watch_interval_ms: u64,
    pub online_check_ms: u64,
    pub skip_discovery: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            session: None,
            local_origin: None,
            tunnel_origin: None,
            client_id: None,
            api_version: DEFAULT_API_VERSION,
            service_polling_ms: millis(DEFAULT_SERVICE_POLLING_INTERVAL),
            watch_interval_ms: millis(DEFAULT_WATCH_INTERVAL),
            online_check_ms: millis(DEFAULT_ONLINE_CHECK_INTERVAL),
            skip_discovery: false,
        }
    }
}

struct Values {
    session: Option<SecretString>,
    local_origin: Option<Url>,
    tunnel_origin: Option<Url>,
    client_id: Option<String>,
    api_version: u32,
    service_polling_interval: Duration,
    watch_interval: Duration,
    online_check_interval: Duration,
    skip_discovery: bool,
}

/// Observable key/value settings.
pub struct Settings {
    values: RwLock<Values>,
    events: EventBus<()>,
}

impl Settings {
    pub fn new() -> Self {
        Self::from_snapshot(SettingsSnapshot::default())
    }

    pub fn from_snapshot(snapshot: SettingsSnapshot) -> Self {
        Self {
            values: RwLock::new(Values::from(snapshot)),
            events: EventBus::with_events(EVENTS),
        }
    }

    /// Change notifications, one event name per property.
    pub fn events(&self) -> &EventBus<()> {
        &self.events
    }

    // ── Session ──────────────────────────────────────────────────────

    pub fn session(&self) -> Option<SecretString> {
        self.read().session.clone()
    }

    pub fn has_session(&self) -> bool {
        self.read()
            .session
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty())
    }

    pub fn set_session(&self, session: Option<SecretString>) {
        let changed = {
            let mut values = self.write();
            let same = match (&values.session, &session) {
                (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
                (None, None) => true,
                _ => false,
            };
            if !same {
                values.session = session;
            }
            !same
        };
        if changed {
            debug!("session changed");
            self.notify(SESSION);
        }
    }

    /// Forget the session token (logout).
    pub fn clear_session(&self) {
        self.set_session(None);
    }

    /// Resolve once a non-empty session token is set.
    pub async fn once_authenticated(&self) -> Result<(), EventBusError> {
        wait_until(&self.events, SESSION, || self.has_session()).await
    }

    // ── Box selection ────────────────────────────────────────────────

    pub fn local_origin(&self) -> Option<Url> {
        self.read().local_origin.clone()
    }

    pub fn set_local_origin(&self, origin: Option<Url>) {
        self.update(LOCAL_ORIGIN, |v| replace(&mut v.local_origin, origin));
    }

    pub fn tunnel_origin(&self) -> Option<Url> {
        self.read().tunnel_origin.clone()
    }

    pub fn set_tunnel_origin(&self, origin: Option<Url>) {
        self.update(TUNNEL_ORIGIN, |v| replace(&mut v.tunnel_origin, origin));
    }

    pub fn client_id(&self) -> Option<String> {
        self.read().client_id.clone()
    }

    pub fn set_client_id(&self, client_id: Option<String>) {
        self.update(CLIENT_ID, |v| replace(&mut v.client_id, client_id));
    }

    pub fn skip_discovery(&self) -> bool {
        self.read().skip_discovery
    }

    pub fn set_skip_discovery(&self, skip: bool) {
        self.update(SKIP_DISCOVERY, |v| replace(&mut v.skip_discovery, skip));
    }

    // ── API tuning ───────────────────────────────────────────────────

    pub fn api_version(&self) -> u32 {
        self.read().api_version
    }

    pub fn set_api_version(&self, version: u32) {
        self.update(API_VERSION, |v| replace(&mut v.api_version, version));
    }

    pub fn service_polling_interval(&self) -> Duration {
        self.read().service_polling_interval
    }

    pub fn set_service_polling_interval(&self, interval: Duration) {
        self.update(SERVICE_POLLING_INTERVAL, |v| {
            replace(&mut v.service_polling_interval, interval)
        });
    }

    pub fn watch_interval(&self) -> Duration {
        self.read().watch_interval
    }

    pub fn set_watch_interval(&self, interval: Duration) {
        self.update(WATCH_INTERVAL, |v| replace(&mut v.watch_interval, interval));
    }

    pub fn online_check_interval(&self) -> Duration {
        self.read().online_check_interval
    }

    pub fn set_online_check_interval(&self, interval: Duration) {
        self.update(ONLINE_CHECK_INTERVAL, |v| {
            replace(&mut v.online_check_interval, interval)
        });
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> SettingsSnapshot {
        let v = self.read();
        SettingsSnapshot {
            session: v.session.as_ref().map(|s| s.expose_secret().to_owned()),
            local_origin: v.local_origin.clone(),
            tunnel_origin: v.tunnel_origin.clone(),
            client_id: v.client_id.clone(),
            api_version: v.api_version,
            service_polling_ms: millis(v.service_polling_interval),
            watch_interval_ms: millis(v.watch_interval),
            online_check_ms: millis(v.online_check_interval),
            skip_discovery: v.skip_discovery,
        }
    }

    /// Apply every value from `snapshot`, emitting events for those that changed.
    pub fn restore(&self, snapshot: SettingsSnapshot) {
        let next = Values::from(snapshot);
        self.set_session(next.session);
        self.set_local_origin(next.local_origin);
        self.set_tunnel_origin(next.tunnel_origin);
        self.set_client_id(next.client_id);
        self.set_api_version(next.api_version);
        self.set_service_polling_interval(next.service_polling_interval);
        self.set_watch_interval(next.watch_interval);
        self.set_online_check_interval(next.online_check_interval);
        self.set_skip_discovery(next.skip_discovery);
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Values> {
        self.values.read().expect("settings lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Values> {
        self.values.write().expect("settings lock poisoned")
    }

    /// Apply `f` under the write lock; emit `event` after releasing it if
    /// `f` reports a change.
    fn update(&self, event: &'static str, f: impl FnOnce(&mut Values) -> bool) {
        let changed = f(&mut self.write());
        if changed {
            debug!(setting = event, "setting changed");
            self.notify(event);
        }
    }

    fn notify(&self, event: &'static str) {
        // Every name passed here is in EVENTS.
        let _ = self.events.emit(event, &());
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl From<SettingsSnapshot> for Values {
    fn from(s: SettingsSnapshot) -> Self {
        Self {
            session: s
                .session
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            local_origin: s.local_origin,
            tunnel_origin: s.tunnel_origin,
            client_id: s.client_id,
            api_version: s.api_version,
            service_polling_interval: Duration::from_millis(s.service_polling_ms),
            watch_interval: Duration::from_millis(s.watch_interval_ms),
            online_check_interval: Duration::from_millis(s.online_check_ms),
            skip_discovery: s.skip_discovery,
        }
    }
}

/// Store `next` into `slot`, returning whether the value changed.
fn replace<T: PartialEq>(slot: &mut T, next: T) -> bool {
    if *slot == next {
        false
    } else {
        *slot = next;
        true
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
