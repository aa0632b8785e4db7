//! `projectlink ping`

use serde::Serialize;

use projectlink_core::Reachability;

use super::Context;
use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct PingView {
    online: bool,
    local: bool,
    remote: bool,
    origin: Option<String>,
}

/// Connecting already pings both paths; this reports the result.
pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.connect().await?;
    let network = ctx.link.network();

    let view = PingView {
        online: network.is_online(),
        local: network.local_reachable(),
        remote: network.remote_reachable(),
        origin: network.origin().map(String::from),
    };

    let out = output::render_single(global.output, &view, |v| {
        output::detail_lines(&[
            ("Online", output::yes_no(v.online)),
            ("Local", output::yes_no(v.local)),
            ("Tunnel", output::yes_no(v.remote)),
            ("Origin", v.origin.clone().unwrap_or_else(|| "-".into())),
        ])
    });
    output::print_output(&out);

    ctx.require_online()
}
