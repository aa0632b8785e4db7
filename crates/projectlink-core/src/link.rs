// ── Top-level owner ──
//
// Builds every component from one `LinkConfig` and wires them together.
// Nothing here is global: hosts construct a `Link` and keep it.

use std::sync::Arc;

use projectlink_api::HubClient;
use tracing::{debug, info};

use crate::api::Api;
use crate::config::{DiscoveryConfig, LinkConfig};
use crate::discovery::{Discovery, discover_box};
use crate::error::CoreError;
use crate::reachability::Network;
use crate::services::Services;
use crate::settings::Settings;
use crate::store::LocalStore;
use crate::visibility::Visibility;

/// The assembled sync core: settings, reachability, API, and services.
#[derive(Clone)]
pub struct Link {
    hub: HubClient,
    discovery: DiscoveryConfig,
    settings: Arc<Settings>,
    visibility: Arc<Visibility>,
    network: Network,
    api: Api,
    services: Services,
}

impl Link {
    pub fn new(config: LinkConfig, store: Arc<dyn LocalStore>) -> Result<Self, CoreError> {
        let hub = HubClient::new(&config.transport())?;
        let settings = Arc::new(Settings::from_snapshot(config.settings));
        let visibility = Arc::new(Visibility::default());
        let network = Network::new(hub.clone(), Arc::clone(&settings));
        let api = Api::new(
            hub.clone(),
            Arc::new(network.clone()),
            Arc::clone(&settings),
            Arc::clone(&visibility),
        );
        let services = Services::new(Arc::new(api.clone()), store, Arc::clone(&settings));

        Ok(Self {
            hub,
            discovery: config.discovery,
            settings,
            visibility,
            network,
            api,
            services,
        })
    }

    /// Resolve the box, start auto-pinging, and ping once.
    pub async fn connect(&self) -> Result<Discovery, CoreError> {
        let outcome = discover_box(&self.hub, &self.settings, &self.discovery).await?;

        if let Err(e) = self
            .network
            .enable_auto_ping(self.settings.online_check_interval())
        {
            debug!(error = %e, "auto-ping already enabled");
        }
        let online = self.network.ping().await;
        info!(online, "link connected");
        Ok(outcome)
    }

    /// Tear down in reverse order of setup: watchers, polling, auto-ping.
    pub fn shutdown(&self) {
        self.api.unwatch_all();
        self.services.toggle_polling(false);
        if self.network.is_auto_pinging() {
            let _ = self.network.disable_auto_ping();
        }
        info!("link shut down");
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn visibility(&self) -> &Arc<Visibility> {
        &self.visibility
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn hub(&self) -> &HubClient {
        &self.hub
    }
}
