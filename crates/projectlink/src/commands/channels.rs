//! Getter / setter channel commands: `get`, `set`, `watch`.

use serde_json::{Value, json};
use tokio::sync::mpsc;

use projectlink_core::{Handler, handler};

use super::Context;
use crate::cli::{GetArgs, GlobalOpts, OutputFormat, SetArgs, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn get(ctx: &Context, args: &GetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.connect().await?;
    ctx.require_online()?;

    let value = ctx
        .bounded(ctx.link.api().fetch_channel(&args.getter))
        .await?
        .ok_or_else(|| CliError::NotFound {
            resource_type: "getter".into(),
            identifier: args.getter.clone(),
        })?;

    output::print_output(&render_value(global.output, &value));
    Ok(())
}

pub async fn set(ctx: &Context, args: &SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    // Parse before connecting so a typo fails fast.
    let value: Value = serde_json::from_str(&args.value)?;

    ctx.connect().await?;
    ctx.require_online()?;

    let response = ctx
        .bounded(ctx.link.api().send_channel(&args.setter, &args.kind, value))
        .await?;

    output::print_output(&render_value(global.output, &response));
    Ok(())
}

pub async fn watch(ctx: &Context, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    ctx.connect().await?;

    let api = ctx.link.api();
    let (tx, mut rx) = mpsc::unbounded_channel::<(String, Value)>();

    let mut registered: Vec<(String, Handler<Value>)> = Vec::with_capacity(args.getters.len());
    for getter in &args.getters {
        let tx = tx.clone();
        let id = getter.clone();
        let on_change = handler(move |value: &Value| {
            let _ = tx.send((id.clone(), value.clone()));
        });
        api.watch(getter, on_change.clone())?;
        registered.push((getter.clone(), on_change));
    }
    drop(tx);

    let mut updates = 0usize;
    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some((getter, value)) = update else { break };
                output::print_output(&render_update(global.output, &getter, &value));
                updates += 1;
                if args.count.is_some_and(|limit| updates >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    for (getter, on_change) in &registered {
        api.unwatch(getter, on_change)?;
    }
    Ok(())
}

fn render_value(format: OutputFormat, value: &Value) -> String {
    match format {
        OutputFormat::Table => value.to_string(),
        OutputFormat::Json => output::render_json(value),
    }
}

/// One line per update so the output can be piped.
fn render_update(format: OutputFormat, getter: &str, value: &Value) -> String {
    match format {
        OutputFormat::Table => format!("{getter}  {value}"),
        OutputFormat::Json => json!({ "getter": getter, "value": value }).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_render_one_line_each() {
        let value = json!({ "OnOff": "On" });
        let table = render_update(OutputFormat::Table, "getter:light@hue", &value);
        assert_eq!(table, r#"getter:light@hue  {"OnOff":"On"}"#);

        let line = render_update(OutputFormat::Json, "getter:light@hue", &value);
        assert!(!line.contains('\n'));
        assert!(line.contains(r#""getter":"getter:light@hue""#));
    }
}
