// ── Channel operations on a service ──

use serde_json::Value;

use super::classify::{DOOR_LOCKED_KIND, LIGHT_ON_KIND, ServiceKind};
use super::model::{Channel, Service};
use crate::api::Api;
use crate::error::CoreError;
use crate::event_bus::Handler;

impl Service {
    fn getter(&self, kind: &str) -> Result<&Channel, CoreError> {
        self.getter_of_kind(kind).ok_or_else(|| CoreError::InvalidArgument {
            message: format!("service {} has no {kind} getter", self.id),
        })
    }

    fn setter(&self, kind: &str) -> Result<&Channel, CoreError> {
        self.setter_of_kind(kind).ok_or_else(|| CoreError::InvalidArgument {
            message: format!("service {} has no {kind} setter", self.id),
        })
    }

    fn require_kind(&self, kind: ServiceKind) -> Result<(), CoreError> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(CoreError::InvalidArgument {
                message: format!("service {} is a {}, not a {kind}", self.id, self.kind),
            })
        }
    }

    /// Current value of this service's getter of `kind`.
    pub async fn fetch(&self, api: &Api, kind: &str) -> Result<Option<Value>, CoreError> {
        let getter = self.getter(kind)?;
        api.fetch_channel(&getter.id).await
    }

    /// Send `value` through this service's setter of `kind`.
    pub async fn send(&self, api: &Api, kind: &str, value: Value) -> Result<Value, CoreError> {
        let setter = self.setter(kind)?;
        api.send_channel(&setter.id, kind, value).await
    }

    pub fn watch(&self, api: &Api, kind: &str, handler: Handler<Value>) -> Result<(), CoreError> {
        let getter = self.getter(kind)?;
        api.watch(&getter.id, handler)
    }

    pub fn unwatch(&self, api: &Api, kind: &str, handler: &Handler<Value>) -> Result<(), CoreError> {
        let getter = self.getter(kind)?;
        api.unwatch(&getter.id, handler)
    }

    // ── Typed helpers ────────────────────────────────────────────────

    pub async fn set_light_on(&self, api: &Api, on: bool) -> Result<Value, CoreError> {
        self.require_kind(ServiceKind::Light)?;
        let value = Value::from(if on { "On" } else { "Off" });
        self.send(api, LIGHT_ON_KIND, value).await
    }

    pub async fn set_door_locked(&self, api: &Api, locked: bool) -> Result<Value, CoreError> {
        self.require_kind(ServiceKind::DoorLock)?;
        let value = Value::from(if locked { "Locked" } else { "Unlocked" });
        self.send(api, DOOR_LOCKED_KIND, value).await
    }
}
