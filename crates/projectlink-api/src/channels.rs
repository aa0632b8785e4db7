//! Wire shapes for the batched channel endpoints.
//!
//! `PUT channels/get` takes an array of `{id}` selectors and answers with an
//! object keyed by channel id, each value being `{<ValueKind>: value}` or
//! `{"Error": ...}`. `PUT channels/set` takes `[[{id}], {<ValueKind>: value}]`
//! tuples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path of the batched getter endpoint, relative to the API root.
pub const GET_PATH: &str = "channels/get";

/// Path of the batched setter endpoint, relative to the API root.
pub const SET_PATH: &str = "channels/set";

/// Key the box uses for per-channel failures in a `channels/get` answer.
pub const ERROR_KEY: &str = "Error";

/// Selects a single channel by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSelector {
    pub id: String,
}

impl ChannelSelector {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Response of `channels/get`: channel id -> typed value object.
pub type ChannelValues = BTreeMap<String, Value>;

/// One entry of a `channels/set` body, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetRequest(pub Vec<ChannelSelector>, pub Map<String, Value>);

impl SetRequest {
    /// Target a single channel with `{kind: value}`.
    pub fn single(id: impl Into<String>, kind: impl Into<String>, value: Value) -> Self {
        Self(vec![ChannelSelector::new(id)], typed_value(kind, value))
    }
}

/// Wrap a raw value as the box's `{<ValueKind>: value}` object.
pub fn typed_value(kind: impl Into<String>, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(kind.into(), value);
    map
}

/// Returns the error payload if `value` is an error-shaped `{"Error": ...}` object.
pub fn error_payload(value: &Value) -> Option<&Value> {
    value.as_object().and_then(|obj| obj.get(ERROR_KEY))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_request_serializes_as_tuple() {
        let req = SetRequest::single("setter:light-1", "OnOff", json!("On"));
        let encoded = serde_json::to_value(vec![req]).unwrap();
        assert_eq!(encoded, json!([[[{ "id": "setter:light-1" }], { "OnOff": "On" }]]));
    }

    #[test]
    fn error_payload_detects_error_objects() {
        assert!(error_payload(&json!({ "Error": { "InternalError": "boom" } })).is_some());
        assert!(error_payload(&json!({ "OnOff": "On" })).is_none());
        assert!(error_payload(&json!("Error")).is_none());
    }
}
