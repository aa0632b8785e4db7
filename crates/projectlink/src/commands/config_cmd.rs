//! Config subcommand handlers.

use serde::Serialize;

use projectlink_config::{ConfigError, config_path, load_config, state_path};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

#[derive(Debug, Serialize)]
struct PathsView {
    config: String,
    state: String,
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let view = PathsView {
                config: config_path().display().to_string(),
                state: state_path().display().to_string(),
            };
            let out = output::render_single(global.output, &view, |v| {
                output::detail_lines(&[("Config", v.config.clone()), ("State", v.state.clone())])
            });
            output::print_output(&out);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load_config()?;
            // Fails for an unknown --profile
            cfg.profile(global.profile.as_deref())?;

            let mut value = toml::Value::try_from(&cfg).map_err(ConfigError::from)?;
            redact_sessions(&mut value);

            let out = match global.output {
                OutputFormat::Table => toml::to_string_pretty(&value).map_err(ConfigError::from)?,
                OutputFormat::Json => output::render_json(&value),
            };
            output::print_output(&out);
            Ok(())
        }
    }
}

fn redact_sessions(config: &mut toml::Value) {
    let Some(profiles) = config.get_mut("profiles").and_then(toml::Value::as_table_mut) else {
        return;
    };
    for (_, profile) in profiles.iter_mut() {
        if let Some(session) = profile.get_mut("session") {
            *session = toml::Value::String(REDACTED.into());
        }
    }
}
