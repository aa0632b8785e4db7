// Registration-service discovery
//
// Boxes periodically register `{local_origin, tunnel_origin}` with a public
// registration service. Clients on the same network ask the service which
// boxes registered recently and pick one. Entries older than
// `REGISTRATION_TTL_SECS` are stale and discarded.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::Error;

/// Registrations older than this many seconds are ignored.
pub const REGISTRATION_TTL_SECS: i64 = 120;

/// Raw entry as returned by the registration service.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRegistration {
    pub client: String,
    /// JSON-encoded [`RegistrationMessage`].
    pub message: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct RegistrationMessage {
    local_origin: Url,
    #[serde(default)]
    tunnel_origin: Option<Url>,
}

/// A box that registered recently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxRegistration {
    pub client_id: String,
    pub local_origin: Url,
    pub tunnel_origin: Option<Url>,
    pub timestamp: DateTime<Utc>,
}

/// Query the registration service once.
///
/// The whole exchange is bounded by `timeout`; expiry is reported as
/// [`Error::Timeout`] so the caller can retry.
pub async fn fetch_registrations(
    http: &reqwest::Client,
    registration_url: &Url,
    timeout: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<BoxRegistration>, Error> {
    debug!(url = %registration_url, "querying registration service");

    let exchange = async {
        let resp = http
            .get(registration_url.clone())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Discovery {
                message: format!("registration service answered HTTP {}", status.as_u16()),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str::<Vec<RawRegistration>>(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    };

    let raw = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| Error::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })??;

    Ok(parse_registrations(raw, now))
}

/// Decode the embedded messages and drop stale or malformed entries.
///
/// The result is sorted newest first.
pub fn parse_registrations(raw: Vec<RawRegistration>, now: DateTime<Utc>) -> Vec<BoxRegistration> {
    let cutoff = now.timestamp() - REGISTRATION_TTL_SECS;

    let mut boxes: Vec<BoxRegistration> = raw
        .into_iter()
        .filter(|entry| entry.timestamp >= cutoff)
        .filter_map(|entry| {
            let message: RegistrationMessage = match serde_json::from_str(&entry.message) {
                Ok(m) => m,
                Err(e) => {
                    debug!(client = %entry.client, error = %e, "skipping malformed registration");
                    return None;
                }
            };
            let timestamp = Utc.timestamp_opt(entry.timestamp, 0).single()?;
            Some(BoxRegistration {
                client_id: entry.client,
                local_origin: message.local_origin,
                tunnel_origin: message.tunnel_origin,
                timestamp,
            })
        })
        .collect();

    boxes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    boxes
}
