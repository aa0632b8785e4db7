// ── Ready-gated API façade ──
//
// Every call validates its path, then waits until the box is reachable,
// a session exists, and the host is visible before touching the network.
// Readiness is checked once per call; a request already in flight is not
// cancelled if any condition is lost afterwards.

mod watch;

pub use watch::values_equal;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use projectlink_api::channels::{self, ChannelSelector, ChannelValues, SetRequest};
use projectlink_api::{HubClient, api_url};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::CoreError;
use crate::event_bus::{EventBus, handler};
use crate::reachability::{Reachability, once_online};
use crate::settings::{self, Settings};
use crate::timer::PersistentTimer;
use crate::visibility::Visibility;

const OCTET_STREAM: &str = "application/octet-stream";

/// Path of the service listing, relative to the API root.
pub const SERVICES_PATH: &str = "services";

pub(crate) struct ApiInner {
    hub: HubClient,
    reachability: Arc<dyn Reachability>,
    settings: Arc<Settings>,
    visibility: Arc<Visibility>,
    /// Watched getter id -> last delivered value (`None` until the first delivery).
    getters: Mutex<BTreeMap<String, Option<Value>>>,
    watch_events: EventBus<Value>,
    watch_timer: PersistentTimer,
}

/// Authenticated access to the box API.
///
/// Cheaply cloneable; clones share the watch registry and its timer.
#[derive(Clone)]
pub struct Api {
    inner: Arc<ApiInner>,
}

impl Api {
    pub fn new(
        hub: HubClient,
        reachability: Arc<dyn Reachability>,
        settings: Arc<Settings>,
        visibility: Arc<Visibility>,
    ) -> Self {
        let watch_interval = settings.watch_interval();
        let inner = Arc::new(ApiInner {
            hub,
            reachability,
            settings,
            visibility,
            getters: Mutex::new(BTreeMap::new()),
            watch_events: EventBus::new(),
            watch_timer: PersistentTimer::new("api-watch", watch_interval),
        });

        let weak = Arc::downgrade(&inner);
        let _ = inner.settings.events().on(
            settings::WATCH_INTERVAL,
            handler(move |_: &()| {
                if let Some(inner) = weak.upgrade() {
                    inner.watch_timer.set_interval(inner.settings.watch_interval());
                }
            }),
        );

        Self { inner }
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.inner.settings
    }

    pub fn reachability(&self) -> &Arc<dyn Reachability> {
        &self.inner.reachability
    }

    /// Resolve once the box is online, a session exists, and the host is visible.
    pub async fn once_ready(&self) -> Result<(), CoreError> {
        let reachability = &*self.inner.reachability;
        tokio::try_join!(
            once_online(reachability),
            self.inner.settings.once_authenticated(),
            self.inner.visibility.once_visible(),
        )?;
        Ok(())
    }

    // ── Verbs ────────────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CoreError> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, CoreError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, body).await
    }

    pub async fn put<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, CoreError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, body).await
    }

    pub async fn delete<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, CoreError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, path, body).await
    }

    /// Gated JSON request against `<origin>/api/v<version>/<path>`.
    pub async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, CoreError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let path = validate_path(path)?;
        self.once_ready().await?;

        let url = self.url(path)?;
        let session = self.inner.settings.session();
        let value = self
            .inner
            .hub
            .request_json(method, url, session.as_ref(), body)
            .await?;
        self.inner.reachability.seen_online();
        Ok(value)
    }

    /// Gated binary request. Sends a `PUT` when `body` is given, a `GET`
    /// otherwise. `accept` defaults to `application/octet-stream`.
    pub async fn blob<B>(&self, path: &str, body: Option<&B>, accept: Option<&str>) -> Result<Bytes, CoreError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let path = validate_path(path)?;
        self.once_ready().await?;

        let method = if body.is_some() { Method::PUT } else { Method::GET };
        let url = self.url(path)?;
        let session = self.inner.settings.session();
        let bytes = self
            .inner
            .hub
            .request_blob(method, url, session.as_ref(), body, accept.unwrap_or(OCTET_STREAM))
            .await?;
        self.inner.reachability.seen_online();
        Ok(bytes)
    }

    // ── Channels ─────────────────────────────────────────────────────

    /// Current value of one getter channel, as `{<ValueKind>: value}`.
    ///
    /// An error-shaped answer is returned as [`CoreError::Api`].
    pub async fn fetch_channel(&self, getter_id: &str) -> Result<Option<Value>, CoreError> {
        let selectors = [ChannelSelector::new(getter_id)];
        let mut values: ChannelValues = self.put(channels::GET_PATH, Some(&selectors[..])).await?;

        match values.remove(getter_id) {
            Some(value) => {
                if let Some(err) = channels::error_payload(&value) {
                    return Err(CoreError::Api {
                        message: format!("getter {getter_id} failed: {err}"),
                        status: None,
                    });
                }
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Send `{kind: value}` to one setter channel.
    pub async fn send_channel(&self, setter_id: &str, kind: &str, value: Value) -> Result<Value, CoreError> {
        let body = [SetRequest::single(setter_id, kind, value)];
        debug!(setter = setter_id, kind, "sending channel value");
        self.put(channels::SET_PATH, Some(&body[..])).await
    }

    /// The raw service listing reported by the box.
    pub async fn fetch_services(&self) -> Result<Vec<Value>, CoreError> {
        let listing: Value = self.get(SERVICES_PATH).await?;
        match listing {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(CoreError::Api {
                message: format!("expected a service array, got {other}"),
                status: None,
            }),
        }
    }

    fn url(&self, path: &str) -> Result<Url, CoreError> {
        let origin = self.inner.reachability.origin().ok_or(CoreError::NoOrigin)?;
        Ok(api_url(&origin, self.inner.settings.api_version(), path)?)
    }
}

/// Reject empty or blank paths before any waiting happens.
fn validate_path(path: &str) -> Result<&str, CoreError> {
    if path.trim().is_empty() {
        return Err(CoreError::InvalidPath {
            path: path.to_owned(),
        });
    }
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn blank_paths_are_rejected() {
        assert!(matches!(validate_path(""), Err(CoreError::InvalidPath { .. })));
        assert!(matches!(validate_path("  "), Err(CoreError::InvalidPath { .. })));
        assert_eq!(validate_path("services").unwrap(), "services");
    }
}
