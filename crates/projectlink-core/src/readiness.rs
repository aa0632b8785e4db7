// ── One-shot readiness waits ──
//
// Resolves immediately when a predicate already holds, otherwise on the
// first qualifying event after which the predicate holds.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::event_bus::{EventBus, EventBusError, Handler};

/// Wait until `is_ready()` returns `true`.
///
/// The listener is registered before the predicate is re-checked, so an
/// event emitted between the first check and the registration is not lost.
/// An event that fires while the predicate is still false (e.g. a session
/// being cleared) re-arms the wait instead of resolving it.
pub async fn wait_until<P, F>(bus: &EventBus<P>, event: &str, is_ready: F) -> Result<(), EventBusError>
where
    P: 'static,
    F: Fn() -> bool,
{
    loop {
        if is_ready() {
            return Ok(());
        }

        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));
        let notify: Handler<P> = Arc::new(move |_: &P| {
            if let Some(tx) = tx.lock().expect("readiness lock poisoned").take() {
                let _ = tx.send(());
            }
        });

        bus.once(event, Arc::clone(&notify))?;
        if is_ready() {
            bus.off(event, &notify)?;
            return Ok(());
        }

        // A dropped sender means the listener was cleared; re-check and re-arm.
        let _ = rx.await;
    }
}
