// ── Box discovery policy ──
//
// Decides which box to talk to. A previously selected box is used right
// away and refreshed in the background; otherwise the registration
// service is polled until some box shows up.

use std::sync::Arc;

use chrono::Utc;
use projectlink_api::discovery::fetch_registrations;
use projectlink_api::{BoxRegistration, HubClient};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DiscoveryConfig;
use crate::error::CoreError;
use crate::settings::Settings;

/// How [`discover_box`] settled on a box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// Discovery is disabled in settings.
    Skipped,
    /// A previously selected box; a background refresh was started.
    Known { local_origin: Url },
    /// Freshly selected from the registration service.
    Found(BoxRegistration),
}

/// Resolve the box to use and store its origins in `settings`.
///
/// Without a known box this retries indefinitely; wrap it in a timeout
/// to bound the wait.
pub async fn discover_box(
    hub: &HubClient,
    settings: &Arc<Settings>,
    config: &DiscoveryConfig,
) -> Result<Discovery, CoreError> {
    if settings.skip_discovery() {
        debug!("discovery skipped by settings");
        return Ok(Discovery::Skipped);
    }

    if let Some(local_origin) = settings.local_origin() {
        let hub = hub.clone();
        let settings = Arc::clone(settings);
        let config = config.clone();
        tokio::spawn(async move {
            match lookup(&hub, &settings, &config).await {
                Ok(Some(found)) => apply(&settings, &found),
                Ok(None) => debug!("background discovery found no box"),
                Err(e) => debug!(error = %e, "background discovery failed"),
            }
        });
        return Ok(Discovery::Known { local_origin });
    }

    loop {
        match lookup(hub, settings, config).await {
            Ok(Some(found)) => {
                apply(settings, &found);
                return Ok(Discovery::Found(found));
            }
            Ok(None) => debug!("no recently registered box"),
            Err(e) => warn!(error = %e, "registration lookup failed"),
        }
        tokio::time::sleep(config.retry).await;
    }
}

/// Prefer the box matching `client_id`, else the newest registration.
pub fn select_box<'a>(boxes: &'a [BoxRegistration], client_id: Option<&str>) -> Option<&'a BoxRegistration> {
    client_id
        .and_then(|id| boxes.iter().find(|b| b.client_id == id))
        .or_else(|| boxes.iter().max_by_key(|b| b.timestamp))
}

async fn lookup(
    hub: &HubClient,
    settings: &Settings,
    config: &DiscoveryConfig,
) -> Result<Option<BoxRegistration>, CoreError> {
    let boxes = fetch_registrations(hub.http(), &config.registration_url, config.timeout, Utc::now()).await?;
    let client_id = settings.client_id();
    Ok(select_box(&boxes, client_id.as_deref()).cloned())
}

fn apply(settings: &Settings, found: &BoxRegistration) {
    info!(client = %found.client_id, local = %found.local_origin, "box selected");
    settings.set_client_id(Some(found.client_id.clone()));
    settings.set_local_origin(Some(found.local_origin.clone()));
    settings.set_tunnel_origin(found.tunnel_origin.clone());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn registration(client: &str, age_secs: i64) -> BoxRegistration {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        BoxRegistration {
            client_id: client.into(),
            local_origin: Url::parse(&format!("http://{client}.local:3000")).unwrap(),
            tunnel_origin: None,
            timestamp: now - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn prefers_known_client_id() {
        let boxes = vec![registration("new", 5), registration("mine", 60)];
        assert_eq!(select_box(&boxes, Some("mine")).unwrap().client_id, "mine");
    }

    #[test]
    fn falls_back_to_newest() {
        let boxes = vec![registration("old", 90), registration("new", 5)];
        assert_eq!(select_box(&boxes, Some("gone")).unwrap().client_id, "new");
        assert_eq!(select_box(&boxes, None).unwrap().client_id, "new");
        assert!(select_box(&[], None).is_none());
    }

    #[tokio::test]
    async fn skip_discovery_short_circuits() {
        let settings = Arc::new(Settings::new());
        settings.set_skip_discovery(true);
        let hub = HubClient::with_client(reqwest::Client::new());

        let outcome = discover_box(&hub, &settings, &DiscoveryConfig::default()).await.unwrap();
        assert_eq!(outcome, Discovery::Skipped);
    }
}
