// ── Services reconciliation cache ──
//
// Keeps the in-memory service map, the local store, and the box's
// listing in agreement. The in-memory map is loaded lazily from the
// store on first access; each reconciliation cycle then writes through
// only the records that actually differ.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::collection::EntityCollection;
use super::model::Service;
use super::similar::is_similar;
use super::stream::{ServiceSnapshot, ServiceStream};
use crate::api::Api;
use crate::error::CoreError;
use crate::event_bus::{EventBus, handler};
use crate::settings::{self, Settings};
use crate::store::{LocalStore, SERVICES_STORE};
use crate::timer::PersistentTimer;

pub const SERVICE_CHANGED: &str = "service-changed";
pub const SERVICES_CHANGED: &str = "services-changed";

/// Payload of the services event bus.
#[derive(Debug, Clone)]
pub enum ServicesEvent {
    /// An existing service changed; carries the new instance.
    ServiceChanged(Arc<Service>),
    /// Services were added or removed; re-read with `get_all()`.
    ServicesChanged,
}

/// Where fresh service listings come from.
#[async_trait]
pub trait ServiceSource: Send + Sync {
    async fn fetch_services(&self) -> Result<Vec<Value>, CoreError>;
}

#[async_trait]
impl ServiceSource for Api {
    async fn fetch_services(&self) -> Result<Vec<Value>, CoreError> {
        Api::fetch_services(self).await
    }
}

/// Ids touched by one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Whether the set of services changed, as opposed to their contents.
    pub fn membership_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

struct ServicesInner {
    source: Arc<dyn ServiceSource>,
    store: Arc<dyn LocalStore>,
    settings: Arc<Settings>,
    collection: EntityCollection<Service>,
    /// Shared lazy load; swapped for a fresh cell on `invalidate()`.
    loaded: Mutex<Arc<OnceCell<()>>>,
    events: EventBus<ServicesEvent>,
    polling: PersistentTimer,
}

/// Cached, reconciled view of the box's services.
#[derive(Clone)]
pub struct Services {
    inner: Arc<ServicesInner>,
}

impl Services {
    pub fn new(source: Arc<dyn ServiceSource>, store: Arc<dyn LocalStore>, settings: Arc<Settings>) -> Self {
        let interval = settings.service_polling_interval();
        let inner = Arc::new(ServicesInner {
            source,
            store,
            settings,
            collection: EntityCollection::new(),
            loaded: Mutex::new(Arc::new(OnceCell::new())),
            events: EventBus::with_events(&[SERVICE_CHANGED, SERVICES_CHANGED]),
            polling: PersistentTimer::new("services-polling", interval),
        });

        let weak = Arc::downgrade(&inner);
        let _ = inner.settings.events().on(
            settings::SERVICE_POLLING_INTERVAL,
            handler(move |_: &()| {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .polling
                        .set_interval(inner.settings.service_polling_interval());
                }
            }),
        );

        Self { inner }
    }

    /// `service-changed` and `services-changed` notifications.
    pub fn events(&self) -> &EventBus<ServicesEvent> {
        &self.inner.events
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Every cached service, ordered by id.
    pub async fn get_all(&self) -> Result<ServiceSnapshot, CoreError> {
        self.ensure_loaded().await?;
        Ok(self.inner.collection.snapshot())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Arc<Service>>, CoreError> {
        self.ensure_loaded().await?;
        Ok(self.inner.collection.get(id))
    }

    /// Subscribe to in-memory snapshot changes.
    pub fn subscribe(&self) -> ServiceStream {
        ServiceStream::new(self.inner.collection.subscribe())
    }

    /// Drop the in-memory map; the next read reloads it from the store.
    pub fn invalidate(&self) {
        *self.inner.loaded.lock().expect("services load lock poisoned") = Arc::new(OnceCell::new());
        self.inner.collection.clear();
        debug!("services cache invalidated");
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Start or stop periodic reconciliation. Both directions are idempotent.
    pub fn toggle_polling(&self, enabled: bool) {
        let polling = &self.inner.polling;
        if enabled == polling.is_running() {
            return;
        }

        if !enabled {
            let _ = polling.stop();
            info!("services polling stopped");
            return;
        }

        polling.set_interval(self.inner.settings.service_polling_interval());
        let weak = Arc::downgrade(&self.inner);
        let started = polling.start(move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => Services { inner }.reconcile().await.map(|_| ()),
                    None => Ok(()),
                }
            }
        });
        if started.is_ok() {
            info!(interval_ms = polling.interval().as_millis(), "services polling started");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner.polling.is_running()
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Run one reconciliation cycle against the box's current listing.
    pub async fn reconcile(&self) -> Result<ReconcileReport, CoreError> {
        self.ensure_loaded().await?;

        let store = &self.inner.store;
        let (stored, fetched) = tokio::try_join!(
            async { store.get_all(SERVICES_STORE).await.map_err(CoreError::from) },
            self.inner.source.fetch_services(),
        )?;

        let stored: BTreeMap<String, Value> = stored
            .into_iter()
            .filter_map(|record| record_id(&record).map(str::to_owned).map(|id| (id, record)))
            .collect();

        // Every id the box listed, parseable or not; none of these is removed.
        let listed: BTreeSet<String> = fetched
            .iter()
            .filter_map(|raw| record_id(raw).map(str::to_owned))
            .collect();
        let fetched: Vec<Service> = fetched
            .into_iter()
            .filter_map(|raw| match Service::from_raw(raw) {
                Ok(service) => Some(service),
                Err(e) => {
                    warn!(error = %e, "skipping malformed service from the box");
                    None
                }
            })
            .collect();

        let mut report = ReconcileReport::default();

        for service in fetched {
            let previous = stored.get(&service.id);
            if previous.is_some_and(|prev| is_similar(prev, &service.raw)) {
                continue;
            }

            store.set(SERVICES_STORE, &service.id, service.raw.clone()).await?;
            let id = service.id.clone();
            let service = Arc::new(service);
            self.inner.collection.upsert(id.clone(), Arc::clone(&service));

            if previous.is_some() {
                debug!(service = %id, "service changed");
                let _ = self
                    .inner
                    .events
                    .emit(SERVICE_CHANGED, &ServicesEvent::ServiceChanged(service));
                report.changed.push(id);
            } else {
                report.added.push(id);
            }
        }

        for id in stored.keys().filter(|id| !listed.contains(*id)) {
            store.remove(SERVICES_STORE, id).await?;
            self.inner.collection.remove(id);
            report.removed.push(id.clone());
        }

        if report.membership_changed() {
            let _ = self
                .inner
                .events
                .emit(SERVICES_CHANGED, &ServicesEvent::ServicesChanged);
        }

        debug!(
            added = report.added.len(),
            changed = report.changed.len(),
            removed = report.removed.len(),
            "services reconciled"
        );
        Ok(report)
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn ensure_loaded(&self) -> Result<(), CoreError> {
        let cell = Arc::clone(&*self.inner.loaded.lock().expect("services load lock poisoned"));
        cell.get_or_try_init(|| self.load_from_store()).await?;
        Ok(())
    }

    async fn load_from_store(&self) -> Result<(), CoreError> {
        let records = self.inner.store.get_all(SERVICES_STORE).await?;
        let services: Vec<(String, Arc<Service>)> = records
            .into_iter()
            .filter_map(|raw| match Service::from_raw(raw) {
                Ok(service) => Some((service.id.clone(), Arc::new(service))),
                Err(e) => {
                    warn!(error = %e, "skipping malformed stored service");
                    None
                }
            })
            .collect();

        debug!(count = services.len(), "services loaded from store");
        self.inner.collection.extend(services);
        Ok(())
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}
