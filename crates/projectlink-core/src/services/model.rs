// ── Service domain types ──

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::classify::{ServiceKind, classify};
use crate::error::CoreError;

/// A getter or setter exposed by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub feature: Option<String>,
    /// Value kind taxonomy, usually a string such as `"LightOn"`.
    #[serde(default)]
    pub kind: Value,
    #[serde(default)]
    pub supports_fetch: Value,
    #[serde(default)]
    pub supports_send: Value,
}

impl Channel {
    /// The kind as a plain name, when the box reports it as a string.
    pub fn kind_name(&self) -> Option<&str> {
        self.kind.as_str()
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind_name() == Some(kind)
    }
}

#[derive(Debug, Deserialize)]
struct RawService {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    adapter: String,
    #[serde(default, deserialize_with = "null_as_default")]
    properties: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    channels: BTreeMap<String, Channel>,
    #[serde(default, deserialize_with = "null_as_default")]
    getters: BTreeMap<String, Channel>,
    #[serde(default, deserialize_with = "null_as_default")]
    setters: BTreeMap<String, Channel>,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: BTreeSet<String>,
}

/// A `null` field reads as the type's default, same as a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A device or capability reported by the box.
///
/// `raw` keeps the record exactly as reported; it is what gets persisted
/// and what change detection compares.
#[derive(Debug, Clone)]
pub struct Service {
    pub id: String,
    pub adapter: String,
    pub kind: ServiceKind,
    pub properties: Map<String, Value>,
    pub channels: BTreeMap<String, Channel>,
    pub getters: BTreeMap<String, Channel>,
    pub setters: BTreeMap<String, Channel>,
    pub tags: BTreeSet<String>,
    pub raw: Value,
}

impl Service {
    pub fn from_raw(raw: Value) -> Result<Self, CoreError> {
        let parsed: RawService =
            serde_json::from_value(raw.clone()).map_err(|e| CoreError::MalformedService {
                message: e.to_string(),
            })?;
        if parsed.id.is_empty() {
            return Err(CoreError::MalformedService {
                message: "service id is empty".into(),
            });
        }

        let kind = classify(&parsed.adapter, &parsed.getters, &parsed.setters);
        Ok(Self {
            id: parsed.id,
            adapter: parsed.adapter,
            kind,
            properties: parsed.properties,
            channels: parsed.channels,
            getters: parsed.getters,
            setters: parsed.setters,
            tags: parsed.tags,
            raw,
        })
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Display name: `name`, then `product_name`, then the id.
    pub fn name(&self) -> &str {
        self.property("name")
            .or_else(|| self.property("product_name"))
            .unwrap_or(&self.id)
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.property("manufacturer")
    }

    pub fn model(&self) -> Option<&str> {
        self.property("model")
    }

    /// First getter whose kind is `kind`.
    pub fn getter_of_kind(&self, kind: &str) -> Option<&Channel> {
        self.getters.values().find(|c| c.is_kind(kind))
    }

    /// First setter whose kind is `kind`.
    pub fn setter_of_kind(&self, kind: &str) -> Option<&Channel> {
        self.setters.values().find(|c| c.is_kind(kind))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hub_record() {
        let raw = json!({
            "id": "hue-1",
            "adapter": "philips_hue@link.mozilla.org",
            "properties": {"name": "Desk lamp", "manufacturer": "Philips"},
            "getters": {
                "getter:on.hue-1": {"id": "getter:on.hue-1", "kind": "LightOn"}
            },
            "setters": {
                "setter:on.hue-1": {"id": "setter:on.hue-1", "kind": "LightOn"}
            },
            "tags": ["living-room"]
        });

        let service = Service::from_raw(raw.clone()).unwrap();
        assert_eq!(service.kind, ServiceKind::Light);
        assert_eq!(service.name(), "Desk lamp");
        assert_eq!(service.manufacturer(), Some("Philips"));
        assert_eq!(service.getter_of_kind("LightOn").unwrap().id, "getter:on.hue-1");
        assert!(service.setter_of_kind("DoorLocked").is_none());
        assert!(service.has_tag("living-room"));
        assert_eq!(service.raw, raw);
    }

    #[test]
    fn missing_id_is_malformed() {
        let err = Service::from_raw(json!({"adapter": "x"})).unwrap_err();
        assert!(matches!(err, CoreError::MalformedService { .. }));
    }

    #[test]
    fn null_fields_read_as_empty() {
        let service = Service::from_raw(json!({
            "id": "svc-3",
            "adapter": null,
            "properties": null,
            "getters": null,
            "tags": null
        }))
        .unwrap();
        assert_eq!(service.name(), "svc-3");
        assert!(service.properties.is_empty());
        assert!(service.getters.is_empty());
        assert!(service.tags.is_empty());
    }

    #[test]
    fn name_falls_back_to_id() {
        let service = Service::from_raw(json!({"id": "svc-9"})).unwrap();
        assert_eq!(service.name(), "svc-9");
        assert_eq!(service.kind, ServiceKind::Generic);
    }
}
