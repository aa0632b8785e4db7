//! Clap derive structures for the `projectlink` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// projectlink -- discover and control a Project Link box
#[derive(Debug, Parser)]
#[command(
    name = "projectlink",
    version,
    about = "Discover and control a Project Link home-automation box",
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "PROJECTLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Box origin to use directly, bypassing discovery
    #[arg(long, env = "PROJECTLINK_ORIGIN", global = true)]
    pub origin: Option<String>,

    /// Session token for the box
    #[arg(long, env = "PROJECTLINK_SESSION", global = true, hide_env_values = true)]
    pub session: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PROJECTLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Seconds to wait for the box to become reachable and ready
    #[arg(long, env = "PROJECTLINK_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PROJECTLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find the box through the registration service
    Discover,

    /// Check whether the box answers on its local and tunnel origins
    Ping,

    /// List services reported by the box
    #[command(alias = "svc")]
    Services(ServicesArgs),

    /// Read the current value of a getter channel
    Get(GetArgs),

    /// Send a value to a setter channel
    Set(SetArgs),

    /// Print getter values as they change
    Watch(WatchArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ServicesArgs {
    /// Keep polling and print the list whenever it changes
    #[arg(long, short = 'w')]
    pub watch: bool,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Getter channel id
    pub getter: String,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Setter channel id
    pub setter: String,

    /// Value kind, e.g. "OnOff" or "DoorLocked"
    pub kind: String,

    /// Value as JSON, e.g. '"On"' or 'true'
    pub value: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Getter channel ids
    #[arg(required = true)]
    pub getters: Vec<String>,

    /// Stop after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config and state file locations
    Path,

    /// Print the resolved configuration (secrets redacted)
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: Shell,
}
