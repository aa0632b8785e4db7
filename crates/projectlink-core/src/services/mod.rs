// ── Services ──

mod actions;
mod cache;
mod classify;
mod collection;
mod model;
mod similar;
mod stream;

pub use cache::{ReconcileReport, SERVICE_CHANGED, SERVICES_CHANGED, ServiceSource, Services, ServicesEvent};
pub use classify::{DOOR_LOCKED_KIND, LIGHT_ON_KIND, ServiceKind, classify};
pub use model::{Channel, Service};
pub use similar::is_similar;
pub use stream::{ServiceSnapshot, ServiceStream, ServiceWatchStream};
