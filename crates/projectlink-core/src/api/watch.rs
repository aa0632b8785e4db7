// ── Batched getter watching ──
//
// All watched getters share one timer. Each tick issues a single
// `channels/get` for every watched id and notifies only the handlers of
// ids whose value changed.

use std::sync::Arc;

use projectlink_api::channels::{self, ChannelSelector, ChannelValues};
use serde_json::Value;
use tracing::{debug, warn};

use super::Api;
use crate::error::CoreError;
use crate::event_bus::Handler;

impl Api {
    /// Register `handler` for value changes of `getter_id`.
    ///
    /// The first watcher overall starts the shared polling timer. The
    /// handler receives the `{<ValueKind>: value}` object.
    pub fn watch(&self, getter_id: &str, handler: Handler<Value>) -> Result<(), CoreError> {
        if getter_id.is_empty() {
            return Err(CoreError::InvalidArgument {
                message: "getter id must not be empty".into(),
            });
        }

        let first_watch = {
            let mut getters = self.getters();
            let first = getters.is_empty();
            getters.entry(getter_id.to_owned()).or_insert(None);
            first
        };
        self.inner.watch_events.on(getter_id, handler)?;

        if first_watch && !self.inner.watch_timer.is_running() {
            self.start_watch_timer();
        }
        debug!(getter = getter_id, "watching getter");
        Ok(())
    }

    /// Remove one handler. Unknown getters log a warning and are ignored.
    pub fn unwatch(&self, getter_id: &str, handler: &Handler<Value>) -> Result<(), CoreError> {
        let mut getters = self.getters();
        if !getters.contains_key(getter_id) {
            warn!(getter = getter_id, "unwatch() on a getter that is not watched");
            return Ok(());
        }

        self.inner.watch_events.off(getter_id, handler)?;
        if !self.inner.watch_events.has_listeners(getter_id)? {
            getters.remove(getter_id);
            debug!(getter = getter_id, "last watcher removed");
        }

        if getters.is_empty() {
            drop(getters);
            let _ = self.inner.watch_timer.stop();
        }
        Ok(())
    }

    /// Drop every watcher and stop polling.
    pub fn unwatch_all(&self) {
        let had_watchers = {
            let mut getters = self.getters();
            let had = !getters.is_empty();
            getters.clear();
            had
        };
        let _ = self.inner.watch_events.off_all(None);
        if had_watchers {
            let _ = self.inner.watch_timer.stop();
        }
    }

    /// Ids currently watched, in order.
    pub fn watched(&self) -> Vec<String> {
        self.getters().keys().cloned().collect()
    }

    /// Fetch every watched getter in one round-trip and notify changes.
    pub async fn poll_watched(&self) -> Result<(), CoreError> {
        let selectors: Vec<ChannelSelector> = self
            .getters()
            .keys()
            .map(ChannelSelector::new)
            .collect();
        if selectors.is_empty() {
            return Ok(());
        }

        let fetched: ChannelValues = self.put(channels::GET_PATH, Some(&selectors)).await?;

        let mut changed = Vec::new();
        {
            let mut getters = self.getters();
            for (id, value) in fetched {
                if let Some(err) = channels::error_payload(&value) {
                    warn!(getter = %id, error = %err, "getter returned an error");
                    continue;
                }
                // Unwatched while the request was in flight.
                let Some(slot) = getters.get_mut(&id) else {
                    continue;
                };
                if slot.as_ref().is_some_and(|prev| values_equal(prev, &value)) {
                    continue;
                }
                *slot = Some(value.clone());
                changed.push((id, value));
            }
        }

        for (id, value) in changed {
            debug!(getter = %id, "getter value changed");
            let _ = self.inner.watch_events.emit(&id, &value);
        }
        Ok(())
    }

    fn start_watch_timer(&self) {
        let weak = Arc::downgrade(&self.inner);
        let started = self.inner.watch_timer.start(move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => Api { inner }.poll_watched().await,
                    None => Ok(()),
                }
            }
        });
        if let Err(e) = started {
            debug!(error = %e, "watch timer already running");
        }
    }

    fn getters(&self) -> std::sync::MutexGuard<'_, std::collections::BTreeMap<String, Option<Value>>> {
        self.inner.getters.lock().expect("watch registry lock poisoned")
    }
}

/// Change detection for watched values.
///
/// Primitives compare by value. Objects and arrays compare by their
/// serialized JSON text, so two structures differing only in key order
/// would count as different. Anything else (mixed kinds) is unequal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Object(_) | Value::Array(_), Value::Object(_) | Value::Array(_)) => {
            match (serde_json::to_string(a), serde_json::to_string(b)) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            }
        }
        _ => false,
    }
}
