use std::convert::Infallible;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use projectlink_api::HubClient;
use tokio::time::Instant;
use tracing::{debug, info, trace};
use url::Url;

use super::{EVENTS, OFFLINE, ONLINE, Reachability, recently_seen};
use crate::event_bus::{EventBus, handler};
use crate::settings::{self, Settings};
use crate::timer::{PersistentTimer, TimerError};

#[derive(Debug, Default)]
struct PathState {
    local: bool,
    remote: bool,
    last_seen: Option<Instant>,
}

impl PathState {
    fn online(&self) -> bool {
        self.local || self.remote
    }
}

struct NetworkInner {
    hub: HubClient,
    settings: Arc<Settings>,
    state: Mutex<PathState>,
    events: EventBus<()>,
    auto_ping: PersistentTimer,
}

/// Dual-path reachability over the local and tunnel origins from [`Settings`].
///
/// `online` is `local || remote`. The origin prefers the local path when
/// both answer.
#[derive(Clone)]
pub struct Network {
    inner: Arc<NetworkInner>,
}

impl Network {
    pub fn new(hub: HubClient, settings: Arc<Settings>) -> Self {
        let interval = settings.online_check_interval();
        let inner = Arc::new(NetworkInner {
            hub,
            settings,
            state: Mutex::new(PathState::default()),
            events: EventBus::with_events(EVENTS),
            auto_ping: PersistentTimer::new("network-auto-ping", interval),
        });

        let weak: Weak<NetworkInner> = Arc::downgrade(&inner);
        let _ = inner.settings.events().on(
            settings::ONLINE_CHECK_INTERVAL,
            handler(move |_: &()| {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .auto_ping
                        .set_interval(inner.settings.online_check_interval());
                }
            }),
        );

        Self { inner }
    }

    pub fn local_reachable(&self) -> bool {
        self.state().local
    }

    pub fn remote_reachable(&self) -> bool {
        self.state().remote
    }

    /// Ping both origins now, regardless of recent confirmations.
    ///
    /// An unset origin counts as unreachable. The local result is applied
    /// before the remote one, so losing one path while gaining the other
    /// emits `offline` then `online`.
    pub async fn ping(&self) -> bool {
        let local = self.inner.settings.local_origin();
        let remote = self.inner.settings.tunnel_origin();
        let hub = &self.inner.hub;

        let (local_ok, remote_ok) = tokio::join!(
            ping_origin(hub, local.as_ref()),
            ping_origin(hub, remote.as_ref()),
        );
        debug!(local = local_ok, remote = remote_ok, "network ping");

        self.update(|s| s.local = local_ok);
        self.update(|s| s.remote = remote_ok);
        self.is_online()
    }

    /// Periodic ping: skipped when `seen_online()` confirmed the box
    /// within the current auto-ping interval.
    pub async fn auto_ping(&self) -> bool {
        let last_seen = self.state().last_seen;
        if recently_seen(last_seen, self.inner.auto_ping.interval()) {
            trace!("auto-ping skipped, recently seen online");
            return self.is_online();
        }
        self.ping().await
    }

    /// Host network-change signal. Going down marks both paths unreachable;
    /// coming back triggers a forced ping.
    pub async fn connectivity_changed(&self, connected: bool) -> bool {
        if connected {
            self.ping().await
        } else {
            self.update(|s| {
                s.local = false;
                s.remote = false;
            });
            false
        }
    }

    /// Ping every `interval` until [`Network::disable_auto_ping`].
    pub fn enable_auto_ping(&self, interval: Duration) -> Result<(), TimerError> {
        self.inner.auto_ping.set_interval(interval);
        let weak = Arc::downgrade(&self.inner);
        self.inner.auto_ping.start(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    Network { inner }.auto_ping().await;
                }
                Ok::<(), Infallible>(())
            }
        })?;
        info!(interval_ms = interval.as_millis(), "network auto-ping enabled");
        Ok(())
    }

    pub fn disable_auto_ping(&self) -> Result<(), TimerError> {
        self.inner.auto_ping.stop()
    }

    pub fn is_auto_pinging(&self) -> bool {
        self.inner.auto_ping.is_running()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn state(&self) -> std::sync::MutexGuard<'_, PathState> {
        self.inner.state.lock().expect("network state lock poisoned")
    }

    fn update(&self, f: impl FnOnce(&mut PathState)) {
        let (before, after) = {
            let mut state = self.state();
            let before = state.online();
            f(&mut state);
            (before, state.online())
        };
        if before != after {
            let name = if after { ONLINE } else { OFFLINE };
            debug!(event = name, "network reachability changed");
            let _ = self.inner.events.emit(name, &());
        }
    }
}

impl Reachability for Network {
    fn is_online(&self) -> bool {
        self.state().online()
    }

    fn origin(&self) -> Option<Url> {
        let (local, remote) = {
            let state = self.state();
            (state.local, state.remote)
        };
        if local {
            self.inner.settings.local_origin()
        } else if remote {
            self.inner.settings.tunnel_origin()
        } else {
            None
        }
    }

    fn seen_online(&self) {
        let has_local = self.inner.settings.local_origin().is_some();
        self.update(|s| {
            s.last_seen = Some(Instant::now());
            if !s.online() {
                if has_local {
                    s.local = true;
                } else {
                    s.remote = true;
                }
            }
        });
    }

    fn events(&self) -> &EventBus<()> {
        &self.inner.events
    }
}

async fn ping_origin(hub: &HubClient, origin: Option<&Url>) -> bool {
    match origin {
        Some(origin) => hub.ping(origin).await,
        None => false,
    }
}
