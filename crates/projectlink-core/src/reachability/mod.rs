// ── Reachability tracking ──
//
// Two trackers share one contract: `Network` follows the local and tunnel
// origins independently, `BoxLink` follows a single resolved origin.
// Both emit `online` / `offline` only when the overall boolean flips.

mod box_link;
mod network;

pub use box_link::BoxLink;
pub use network::Network;

use url::Url;

use crate::event_bus::{EventBus, EventBusError};
use crate::readiness::wait_until;

pub const ONLINE: &str = "online";
pub const OFFLINE: &str = "offline";

pub(crate) const EVENTS: &[&str] = &[ONLINE, OFFLINE];

/// Shared view of "can we reach the box, and where".
pub trait Reachability: Send + Sync {
    fn is_online(&self) -> bool;

    /// The origin requests should go to, if any path is reachable.
    fn origin(&self) -> Option<Url>;

    /// Record that the box answered some unrelated request.
    fn seen_online(&self);

    /// `online` / `offline` transitions.
    fn events(&self) -> &EventBus<()>;
}

/// Resolve once `reachability` reports online.
pub async fn once_online(reachability: &dyn Reachability) -> Result<(), EventBusError> {
    wait_until(reachability.events(), ONLINE, || reachability.is_online()).await
}

/// Whether a confirmation stamped at `last_seen` still covers `window`.
pub(crate) fn recently_seen(last_seen: Option<tokio::time::Instant>, window: std::time::Duration) -> bool {
    last_seen.is_some_and(|at| at.elapsed() < window)
}
