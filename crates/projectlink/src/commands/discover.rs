//! `projectlink discover`

use serde::Serialize;

use projectlink_core::Discovery;

use super::Context;
use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct DiscoveryView {
    source: &'static str,
    client_id: Option<String>,
    local_origin: Option<String>,
    tunnel_origin: Option<String>,
    registered_at: Option<String>,
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let outcome = ctx.connect().await?;
    let settings = ctx.link.settings();

    let view = match outcome {
        Discovery::Found(registration) => DiscoveryView {
            source: "registration",
            client_id: Some(registration.client_id),
            local_origin: Some(registration.local_origin.to_string()),
            tunnel_origin: registration.tunnel_origin.map(String::from),
            registered_at: Some(registration.timestamp.to_rfc3339()),
        },
        Discovery::Known { local_origin } => DiscoveryView {
            source: "remembered",
            client_id: settings.client_id(),
            local_origin: Some(local_origin.to_string()),
            tunnel_origin: settings.tunnel_origin().map(String::from),
            registered_at: None,
        },
        Discovery::Skipped => DiscoveryView {
            source: "configured",
            client_id: settings.client_id(),
            local_origin: settings.local_origin().map(String::from),
            tunnel_origin: settings.tunnel_origin().map(String::from),
            registered_at: None,
        },
    };

    let out = output::render_single(global.output, &view, |v| {
        output::detail_lines(&[
            ("Source", v.source.to_owned()),
            ("Box", dash(v.client_id.as_deref())),
            ("Local origin", dash(v.local_origin.as_deref())),
            ("Tunnel origin", dash(v.tunnel_origin.as_deref())),
            ("Registered", dash(v.registered_at.as_deref())),
        ])
    });
    output::print_output(&out);
    Ok(())
}

fn dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_owned()
}
