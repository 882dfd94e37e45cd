use clap::{Args, Parser, Subcommand};
use cookieguard_policy::CategoryId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cookieguard",
    version,
    about = "Cookie consent management: inspect the cookie policy, record consent and enforce it"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Consent configuration file (YAML). Environment variables are used when omitted
    #[arg(long, global = true, env = "COOKIEGUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cookie policy catalog (YAML). Defaults to the built-in catalog
    #[arg(long, global = true, env = "COOKIEGUARD_POLICY")]
    pub policy: Option<PathBuf>,

    /// Directory holding the stored consent record
    #[arg(long, global = true, env = "COOKIEGUARD_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect or validate a cookie policy catalog
    Policy(PolicyArgs),
    /// Show the current consent state
    Status(StatusArgs),
    /// Grant every category
    AcceptAll(DecisionArgs),
    /// Refuse every optional category
    RejectAll(DecisionArgs),
    /// Grant only the listed categories
    Customize(CustomizeArgs),
    /// Withdraw consent and forget the stored record
    Withdraw,
    /// Check whether a cookie may be set under the current consent
    Check(CheckArgs),
    /// Print the Set-Cookie headers that remove refused cookies
    Enforce(EnforceArgs),
    /// Print the version
    Version,
}

#[derive(Parser, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub cmd: PolicyCommand,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Print the active catalog
    Show(PolicyShowArgs),
    /// Load a catalog and check it
    Validate(PolicyValidateArgs),
}

#[derive(Args, Debug)]
pub struct PolicyShowArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PolicyValidateArgs {
    pub input: PathBuf,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[arg(long)]
    pub json: bool,
}

/// Client details recorded in the audit trail.
#[derive(Args, Debug, Clone, Default)]
pub struct DecisionArgs {
    #[arg(long)]
    pub ip_address: Option<String>,

    #[arg(long)]
    pub user_agent: Option<String>,
}

#[derive(Args, Debug)]
pub struct CustomizeArgs {
    /// Categories to grant, comma separated (essential is always granted)
    #[arg(long, value_delimiter = ',')]
    pub allow: Vec<CategoryId>,

    #[command(flatten)]
    pub client: DecisionArgs,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Cookie name
    pub cookie: String,
}

#[derive(Args, Debug)]
pub struct EnforceArgs {
    #[arg(long)]
    pub json: bool,
}
