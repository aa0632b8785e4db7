use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use projectlink_api::HubClient;
use tokio::time::Instant;
use tracing::{debug, info, trace};
use url::Url;

use super::{EVENTS, OFFLINE, ONLINE, Reachability, recently_seen};
use crate::event_bus::EventBus;
use crate::timer::{PersistentTimer, TimerError};

#[derive(Debug, Default)]
struct LinkState {
    reachable: bool,
    last_seen_at: Option<Instant>,
}

struct BoxLinkInner {
    hub: HubClient,
    origin: Url,
    state: Mutex<LinkState>,
    events: EventBus<()>,
    auto_ping: PersistentTimer,
}

/// Single-path reachability against one already-resolved origin.
#[derive(Clone)]
pub struct BoxLink {
    inner: Arc<BoxLinkInner>,
}

impl BoxLink {
    pub fn new(hub: HubClient, origin: Url) -> Self {
        Self {
            inner: Arc::new(BoxLinkInner {
                hub,
                origin,
                state: Mutex::new(LinkState::default()),
                events: EventBus::with_events(EVENTS),
                auto_ping: PersistentTimer::new("box-link-auto-ping", Duration::from_secs(5)),
            }),
        }
    }

    /// When `seen_online()` last confirmed the box.
    pub fn last_seen_at(&self) -> Option<Instant> {
        self.state().last_seen_at
    }

    /// Ping the origin now. Never errors: failures read as unreachable.
    pub async fn ping(&self) -> bool {
        let reachable = self.inner.hub.ping(&self.inner.origin).await;
        debug!(origin = %self.inner.origin, reachable, "box ping");
        self.set_reachable(reachable, false);
        reachable
    }

    /// Periodic ping, skipped while a recent `seen_online()` covers it.
    pub async fn auto_ping(&self) -> bool {
        let last_seen = self.state().last_seen_at;
        if recently_seen(last_seen, self.inner.auto_ping.interval()) {
            trace!(origin = %self.inner.origin, "auto-ping skipped");
            return self.is_online();
        }
        self.ping().await
    }

    pub fn enable_auto_ping(&self, interval: Duration) -> Result<(), TimerError> {
        self.inner.auto_ping.set_interval(interval);
        let weak = Arc::downgrade(&self.inner);
        self.inner.auto_ping.start(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    BoxLink { inner }.auto_ping().await;
                }
                Ok::<(), Infallible>(())
            }
        })?;
        info!(origin = %self.inner.origin, "box auto-ping enabled");
        Ok(())
    }

    pub fn disable_auto_ping(&self) -> Result<(), TimerError> {
        self.inner.auto_ping.stop()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LinkState> {
        self.inner.state.lock().expect("box link lock poisoned")
    }

    fn set_reachable(&self, reachable: bool, stamp: bool) {
        let changed = {
            let mut state = self.state();
            if stamp {
                state.last_seen_at = Some(Instant::now());
            }
            let changed = state.reachable != reachable;
            state.reachable = reachable;
            changed
        };
        if changed {
            let name = if reachable { ONLINE } else { OFFLINE };
            let _ = self.inner.events.emit(name, &());
        }
    }
}

impl Reachability for BoxLink {
    fn is_online(&self) -> bool {
        self.state().reachable
    }

    fn origin(&self) -> Option<Url> {
        self.is_online().then(|| self.inner.origin.clone())
    }

    fn seen_online(&self) {
        self.set_reachable(true, true);
    }

    fn events(&self) -> &EventBus<()> {
        &self.inner.events
    }
}
