//! Async HTTP client for the Project Link box API.
//!
//! This crate owns the wire-level concerns only: building the
//! `reqwest::Client`, constructing `<origin>/api/v<version>/<path>` URLs,
//! bearer authentication, JSON and blob encoding, the `channels/get` and
//! `channels/set` payload shapes, `/ping` checks, and the registration
//! service used for box discovery. Readiness gating, polling, and caching
//! live in `projectlink-core`.

pub mod channels;
pub mod discovery;
pub mod error;
pub mod hub;
pub mod transport;

pub use channels::{ChannelSelector, ChannelValues, SetRequest};
pub use discovery::{BoxRegistration, REGISTRATION_TTL_SECS};
pub use error::Error;
pub use hub::{HubClient, api_url};
pub use transport::TransportConfig;
