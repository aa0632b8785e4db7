//! Command handlers that talk to the box.

pub mod channels;
pub mod config_cmd;
pub mod discover;
pub mod ping;
pub mod services;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use projectlink_config::{StateFile, profile_to_link_config};
use projectlink_core::{
    CoreError, Discovery, Link, MemoryStore, Reachability, SettingsSnapshot, TlsVerification,
};
use tracing::{debug, warn};
use url::Url;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = Context::open(global)?;

    let result = match cmd {
        Command::Discover => discover::handle(&ctx, global).await,
        Command::Ping => ping::handle(&ctx, global).await,
        Command::Services(args) => services::handle(&ctx, &args, global).await,
        Command::Get(args) => channels::get(&ctx, &args, global).await,
        Command::Set(args) => channels::set(&ctx, &args, global).await,
        Command::Watch(args) => channels::watch(&ctx, &args, global).await,
        Command::Config(_) | Command::Completions(_) => unreachable!("handled in main"),
    };

    ctx.link.shutdown();
    result
}

/// A `Link` built from config, state file, and flag overrides.
pub struct Context {
    pub link: Link,
    state: StateFile,
    profile: String,
    wait: Duration,
    /// False when `--origin` overrides the box; such runs leave the state file alone.
    persist: bool,
}

impl Context {
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = projectlink_config::load_config_or_default();
        let (profile_name, profile) = config.profile(global.profile.as_deref())?;

        let state = StateFile::default_location();
        let snapshot = state.load().unwrap_or_else(|e| {
            warn!(error = %e, path = %state.path().display(), "ignoring unreadable state file");
            SettingsSnapshot::default()
        });

        let mut link_config = profile_to_link_config(&config, profile, profile_name, snapshot)?;

        if let Some(ref origin) = global.origin {
            let url: Url = origin.parse().map_err(|_| CliError::Validation {
                field: "origin".into(),
                reason: format!("invalid URL: {origin}"),
            })?;
            link_config.settings.local_origin = Some(url);
            link_config.settings.tunnel_origin = None;
            link_config.settings.skip_discovery = true;
        }
        if let Some(ref session) = global.session {
            link_config.settings.session = Some(session.clone());
        }
        if global.insecure {
            link_config.tls = TlsVerification::DangerAcceptInvalid;
        }

        debug!(profile = profile_name, "building link");
        let link = Link::new(link_config, Arc::new(MemoryStore::default()))?;

        Ok(Self {
            link,
            state,
            profile: profile_name.to_owned(),
            wait: Duration::from_secs(global.timeout),
            persist: global.origin.is_none(),
        })
    }

    /// Discover the box and ping it, then remember the selection.
    pub async fn connect(&self) -> Result<Discovery, CliError> {
        let outcome = self.bounded(self.link.connect()).await?;
        self.save_state();
        Ok(outcome)
    }

    /// Fail with [`CliError::Offline`] unless the last ping found the box.
    pub fn require_online(&self) -> Result<(), CliError> {
        if self.link.network().is_online() {
            Ok(())
        } else {
            Err(CliError::Offline)
        }
    }

    /// Run a core call, giving up after `--timeout`.
    pub async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CliError> {
        match tokio::time::timeout(self.wait, fut).await {
            Ok(result) => result.map_err(|e| self.map_core(e)),
            Err(_) => Err(CliError::Timeout {
                seconds: self.wait.as_secs(),
            }),
        }
    }

    fn map_core(&self, err: CoreError) -> CliError {
        match err {
            CoreError::Unauthorized => CliError::Unauthorized {
                profile: self.profile.clone(),
            },
            other => other.into(),
        }
    }

    fn save_state(&self) {
        if !self.persist {
            return;
        }
        if let Err(e) = self.state.save(&self.link.settings().snapshot()) {
            warn!(error = %e, "failed to persist state");
        }
    }
}
