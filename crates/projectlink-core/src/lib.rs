//! Client-side sync core for a Project Link box.
//!
//! The box is a home-automation hub reachable over the local network and
//! through a remote tunnel. This crate keeps a client in step with it:
//!
//! - **[`EventBus`]** and **[`PersistentTimer`]** are the building blocks:
//!   named synchronous events, and a single-flight periodic task.
//!
//! - **[`Settings`]** holds the session, the selected box, and polling
//!   intervals, with a change event per property.
//!
//! - **Reachability** ([`Network`], [`BoxLink`]) pings the box and
//!   emits `online` / `offline` transitions. [`discover_box`] finds the
//!   box through the registration service.
//!
//! - **[`Api`]** is the ready-gated façade: requests wait until the box is
//!   online, a session exists, and the host is visible. It also batches
//!   getter watching into one `channels/get` round-trip per tick.
//!
//! - **[`Services`]** reconciles the box's service listing with a
//!   [`LocalStore`] and an in-memory cache.
//!
//! - **[`Link`]** owns and wires all of the above.

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod event_bus;
pub mod link;
pub mod reachability;
pub mod readiness;
pub mod services;
pub mod settings;
pub mod store;
pub mod timer;
pub mod visibility;

// ── Primary re-exports ──────────────────────────────────────────────
pub use api::{Api, values_equal};
pub use config::{DiscoveryConfig, LinkConfig, TlsVerification};
pub use discovery::{Discovery, discover_box, select_box};
pub use error::CoreError;
pub use event_bus::{EventBus, EventBusError, Handler, handler};
pub use link::Link;
pub use reachability::{BoxLink, Network, Reachability, once_online};
pub use readiness::wait_until;
pub use services::{
    Channel, ReconcileReport, Service, ServiceKind, ServiceSource, ServiceStream, Services, ServicesEvent,
    classify, is_similar,
};
pub use settings::{Settings, SettingsSnapshot};
pub use store::{LocalStore, MemoryStore, StoreError};
pub use timer::{PersistentTimer, TimerError};
pub use visibility::Visibility;

pub use projectlink_api::BoxRegistration;
