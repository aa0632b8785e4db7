// ── Named-event publish/subscribe ──
//
// Components own an `EventBus` and expose it by reference; nothing
// inherits from it. Handlers run synchronously in registration order and
// a panicking handler is logged without starving the ones after it.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::error;

/// A registered callback. Identity (for `off` and de-duplication) is the
/// `Arc` allocation, so keep a clone of the handle you registered.
pub type Handler<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Wrap a closure into a [`Handler`].
pub fn handler<P, F>(f: F) -> Handler<P>
where
    F: Fn(&P) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventBusError {
    #[error("event '{name}' is not declared on this bus")]
    InvalidEventName { name: String },

    #[error("{message}")]
    InvalidArgument { message: String },
}

struct Registration<P> {
    handler: Handler<P>,
    once: bool,
}

impl<P> Clone for Registration<P> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            once: self.once,
        }
    }
}

/// Typed publish/subscribe keyed by event name.
///
/// When built with [`with_events`](Self::with_events) every operation
/// rejects names outside the declared list; [`new`](Self::new) accepts any
/// non-empty name.
pub struct EventBus<P> {
    allowed: Option<Vec<&'static str>>,
    listeners: DashMap<String, Vec<Registration<P>>>,
}

impl<P> EventBus<P> {
    /// A bus accepting any non-empty event name.
    pub fn new() -> Self {
        Self {
            allowed: None,
            listeners: DashMap::new(),
        }
    }

    /// A bus restricted to the given event names.
    pub fn with_events(allowed: &[&'static str]) -> Self {
        Self {
            allowed: Some(allowed.to_vec()),
            listeners: DashMap::new(),
        }
    }

    /// Register `handler` for `name`. Registering the same handler twice
    /// for the same name is a no-op.
    pub fn on(&self, name: &str, handler: Handler<P>) -> Result<(), EventBusError> {
        self.register(name, handler, false)
    }

    /// Register `handler` for a single delivery of `name`.
    pub fn once(&self, name: &str, handler: Handler<P>) -> Result<(), EventBusError> {
        self.register(name, handler, true)
    }

    /// Remove `handler` from `name`. Unknown handlers are ignored.
    pub fn off(&self, name: &str, handler: &Handler<P>) -> Result<(), EventBusError> {
        self.validate(name)?;
        if let Some(mut regs) = self.listeners.get_mut(name) {
            regs.retain(|r| !same_handler(&r.handler, handler));
        }
        self.listeners.remove_if(name, |_, regs| regs.is_empty());
        Ok(())
    }

    /// Remove every handler for `name`, or for all events when `None`.
    pub fn off_all(&self, name: Option<&str>) -> Result<(), EventBusError> {
        match name {
            Some(name) => {
                self.validate(name)?;
                self.listeners.remove(name);
            }
            None => self.listeners.clear(),
        }
        Ok(())
    }

    /// Whether at least one handler is registered for `name`.
    pub fn has_listeners(&self, name: &str) -> Result<bool, EventBusError> {
        self.validate(name)?;
        Ok(self
            .listeners
            .get(name)
            .is_some_and(|regs| !regs.is_empty()))
    }

    /// Invoke every handler registered for `name`, in registration order.
    ///
    /// The handler list is snapshotted before the first call, so handlers
    /// may register or remove listeners on this bus while running.
    pub fn emit(&self, name: &str, payload: &P) -> Result<(), EventBusError> {
        self.validate(name)?;

        let snapshot: Vec<Registration<P>> = match self.listeners.get_mut(name) {
            Some(mut regs) => {
                let snapshot = regs.clone();
                regs.retain(|r| !r.once);
                snapshot
            }
            None => return Ok(()),
        };
        self.listeners.remove_if(name, |_, regs| regs.is_empty());

        for reg in snapshot {
            let handler = &reg.handler;
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                error!(
                    event = name,
                    panic = panic_message(&*panic),
                    "event handler panicked"
                );
            }
        }

        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn register(&self, name: &str, handler: Handler<P>, once: bool) -> Result<(), EventBusError> {
        self.validate(name)?;
        let mut regs = self.listeners.entry(name.to_owned()).or_default();
        if !regs.iter().any(|r| same_handler(&r.handler, &handler)) {
            regs.push(Registration { handler, once });
        }
        Ok(())
    }

    fn validate(&self, name: &str) -> Result<(), EventBusError> {
        if name.trim().is_empty() {
            return Err(EventBusError::InvalidArgument {
                message: "event name must not be empty".into(),
            });
        }
        if let Some(ref allowed) = self.allowed {
            if !allowed.contains(&name) {
                return Err(EventBusError::InvalidEventName { name: name.into() });
            }
        }
        Ok(())
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn same_handler<P>(a: &Handler<P>, b: &Handler<P>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Handler<u32>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, handler(move |_: &u32| {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn emit_reaches_handlers_in_order() {
        let bus = EventBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.on("tick", handler(move |v: &u32| seen.lock().unwrap().push((tag, *v))))
                .unwrap();
        }
        bus.emit("tick", &7).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn on_is_idempotent_per_handler() {
        let bus = EventBus::<u32>::new();
        let (count, h) = counter();

        bus.on("tick", Arc::clone(&h)).unwrap();
        bus.on("tick", Arc::clone(&h)).unwrap();
        bus.emit("tick", &1).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn once_fires_a_single_time() {
        let bus = EventBus::<u32>::new();
        let (count, h) = counter();

        bus.once("tick", h).unwrap();
        bus.emit("tick", &1).unwrap();
        bus.emit("tick", &2).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.has_listeners("tick").unwrap());
    }

    #[test]
    fn off_removes_only_that_handler() {
        let bus = EventBus::<u32>::new();
        let (count_a, a) = counter();
        let (count_b, b) = counter();

        bus.on("tick", Arc::clone(&a)).unwrap();
        bus.on("tick", b).unwrap();
        bus.off("tick", &a).unwrap();
        bus.emit("tick", &1).unwrap();

        assert_eq!(count_a.load(Ordering::SeqCst), 0);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_all_clears_one_or_every_event() {
        let bus = EventBus::<u32>::new();
        let (_, a) = counter();
        let (_, b) = counter();
        bus.on("one", a).unwrap();
        bus.on("two", b).unwrap();

        bus.off_all(Some("one")).unwrap();
        assert!(!bus.has_listeners("one").unwrap());
        assert!(bus.has_listeners("two").unwrap());

        bus.off_all(None).unwrap();
        assert!(!bus.has_listeners("two").unwrap());
    }

    #[test]
    fn panicking_handler_does_not_block_others() {
        let bus = EventBus::<u32>::new();
        let (count, h) = counter();

        bus.on("tick", handler(|_: &u32| panic!("handler failure"))).unwrap();
        bus.on("tick", h).unwrap();
        bus.emit("tick", &1).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn declared_events_reject_unknown_names() {
        let bus = EventBus::<u32>::with_events(&["online", "offline"]);
        let (_, h) = counter();

        assert!(bus.on("online", Arc::clone(&h)).is_ok());
        assert_eq!(
            bus.on("onlin", Arc::clone(&h)),
            Err(EventBusError::InvalidEventName { name: "onlin".into() })
        );
        assert!(matches!(
            bus.emit("nope", &1),
            Err(EventBusError::InvalidEventName { .. })
        ));
        assert!(bus.has_listeners("nope").is_err());
    }

    #[test]
    fn empty_names_are_invalid_arguments() {
        let bus = EventBus::<u32>::new();
        let (_, h) = counter();

        assert!(matches!(
            bus.on("", h),
            Err(EventBusError::InvalidArgument { .. })
        ));
        assert!(matches!(
            bus.emit("  ", &1),
            Err(EventBusError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn handler_may_unsubscribe_itself_during_emit() {
        let bus = Arc::new(EventBus::<u32>::new());
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Handler<u32>>>> = Arc::new(Mutex::new(None));

        let h = {
            let bus = Arc::clone(&bus);
            let count = Arc::clone(&count);
            let slot = Arc::clone(&slot);
            handler(move |_: &u32| {
                count.fetch_add(1, Ordering::SeqCst);
                if let Some(me) = slot.lock().unwrap().take() {
                    bus.off("tick", &me).unwrap();
                }
            })
        };
        *slot.lock().unwrap() = Some(Arc::clone(&h));
        bus.on("tick", h).unwrap();

        bus.emit("tick", &1).unwrap();
        bus.emit("tick", &2).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
