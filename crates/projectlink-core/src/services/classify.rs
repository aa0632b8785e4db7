// ── Service classification ──
//
// Picks the specialized service kind from the adapter tag and, for
// Z-Wave devices, from the kinds of their channels. Pure and total.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::model::Channel;

const CAMERA_ADAPTER_PREFIX: &str = "ip-camera@";
const HUE_ADAPTER_PREFIX: &str = "philips_hue@";
const OPENZWAVE_ADAPTER: &str = "OpenZwave Adapter";
/// Channel kind marking a door lock.
pub const DOOR_LOCKED_KIND: &str = "DoorLocked";

/// Channel kind switching a light.
pub const LIGHT_ON_KIND: &str = "LightOn";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    #[default]
    Generic,
    Light,
    Camera,
    DoorLock,
    MotionSensor,
}

pub fn classify(
    adapter: &str,
    getters: &BTreeMap<String, Channel>,
    setters: &BTreeMap<String, Channel>,
) -> ServiceKind {
    if adapter.starts_with(CAMERA_ADAPTER_PREFIX) {
        return ServiceKind::Camera;
    }
    if adapter.starts_with(HUE_ADAPTER_PREFIX) {
        return ServiceKind::Light;
    }
    if adapter != OPENZWAVE_ADAPTER {
        return ServiceKind::Generic;
    }

    let door_lock = getters
        .values()
        .chain(setters.values())
        .any(|c| c.is_kind(DOOR_LOCKED_KIND));
    if door_lock {
        ServiceKind::DoorLock
    } else if !getters.is_empty() {
        ServiceKind::MotionSensor
    } else {
        ServiceKind::Generic
    }
}
