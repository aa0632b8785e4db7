//! `projectlink services [--watch]`

use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use projectlink_core::{Service, ServiceKind};

use super::Context;
use crate::cli::{GlobalOpts, OutputFormat, ServicesArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ServiceView {
    id: String,
    name: String,
    kind: ServiceKind,
    adapter: String,
    getters: Vec<String>,
    setters: Vec<String>,
    tags: Vec<String>,
}

impl From<&Service> for ServiceView {
    fn from(s: &Service) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name().to_owned(),
            kind: s.kind,
            adapter: s.adapter.clone(),
            getters: s.getters.keys().cloned().collect(),
            setters: s.setters.keys().cloned().collect(),
            tags: s.tags.iter().cloned().collect(),
        }
    }
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Adapter")]
    adapter: String,
    #[tabled(rename = "Getters")]
    getters: usize,
    #[tabled(rename = "Setters")]
    setters: usize,
    #[tabled(rename = "Tags")]
    tags: String,
}

fn service_row(v: &ServiceView) -> ServiceRow {
    ServiceRow {
        id: v.id.clone(),
        name: v.name.clone(),
        kind: v.kind.to_string(),
        adapter: v.adapter.clone(),
        getters: v.getters.len(),
        setters: v.setters.len(),
        tags: v.tags.join(", "),
    }
}

pub async fn handle(ctx: &Context, args: &ServicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.connect().await?;
    ctx.require_online()?;

    let services = ctx.link.services();
    let report = ctx.bounded(services.reconcile()).await?;
    debug!(
        added = report.added.len(),
        changed = report.changed.len(),
        removed = report.removed.len(),
        "initial reconcile"
    );

    let snapshot = ctx.bounded(services.get_all()).await?;
    print_services(global.output, &snapshot);

    if !args.watch {
        return Ok(());
    }

    let mut snapshots = services.subscribe().into_stream();
    services.toggle_polling(true);
    loop {
        tokio::select! {
            next = snapshots.next() => match next {
                Some(snapshot) => print_services(global.output, &snapshot),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    services.toggle_polling(false);
    Ok(())
}

fn print_services(format: OutputFormat, snapshot: &[Arc<Service>]) {
    let views: Vec<ServiceView> = snapshot.iter().map(|s| ServiceView::from(s.as_ref())).collect();
    let out = output::render_list(format, &views, service_row);
    output::print_output(&out);
}
