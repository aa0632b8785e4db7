//! Foreground/background signal reported by the hosting UI.
//!
//! API calls are held back while the host is hidden, mirroring how the
//! client stops talking to the box when its window is not on screen.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::event_bus::{EventBus, EventBusError};
use crate::readiness::wait_until;

pub const VISIBLE: &str = "visible";
pub const HIDDEN: &str = "hidden";

pub struct Visibility {
    visible: AtomicBool,
    events: EventBus<()>,
}

impl Visibility {
    pub fn new(visible: bool) -> Self {
        Self {
            visible: AtomicBool::new(visible),
            events: EventBus::with_events(&[VISIBLE, HIDDEN]),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Record a visibility change, emitting `visible` / `hidden` on transitions.
    pub fn set_visible(&self, visible: bool) {
        let was = self.visible.swap(visible, Ordering::SeqCst);
        if was == visible {
            return;
        }

        debug!(visible, "host visibility changed");
        let name = if visible { VISIBLE } else { HIDDEN };
        // Names are declared above; emit cannot fail validation.
        let _ = self.events.emit(name, &());
    }

    pub fn events(&self) -> &EventBus<()> {
        &self.events
    }

    /// Resolve once the host is visible.
    pub async fn once_visible(&self) -> Result<(), EventBusError> {
        wait_until(&self.events, VISIBLE, || self.is_visible()).await
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::new(true)
    }
}
