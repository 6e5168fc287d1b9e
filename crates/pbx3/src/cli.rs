//! Clap derive structures for the `pbx3` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pbx3 -- command-line client for the PBX3 admin API
#[derive(Debug, Parser)]
#[command(
    name = "pbx3",
    version,
    about = "Talk to a PBX3 admin API from the command line",
    long_about = "A thin operator client for the PBX3 multi-tenant administration API.\n\n\
        Issues authenticated requests against any resource path and inspects\n\
        the schema metadata that describes which fields are editable.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Profile to use
    #[arg(long, short = 'p', env = "PBX3_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base endpoint, e.g. https://pbx.example.com/api (overrides profile)
    #[arg(long, short = 'u', env = "PBX3_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Bearer token (overrides profile and keyring)
    #[arg(long, env = "PBX3_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format [default: from config, else json]
    #[arg(long, short = 'o', env = "PBX3_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PBX3_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds [default: from profile, else 30]
    #[arg(long, env = "PBX3_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify a token and remember it for the profile
    Login(LoginArgs),

    /// Forget the stored token for the profile
    Logout,

    /// Show the identity behind the current token
    Whoami,

    /// GET a resource path
    Get(GetArgs),

    /// POST a JSON body to a resource path
    Post(BodyArgs),

    /// PUT a JSON body to a resource path
    Put(BodyArgs),

    /// DELETE a resource path
    #[command(alias = "rm")]
    Delete(PathArgs),

    /// Download a binary resource (recordings, greetings, backups)
    Blob(BlobArgs),

    /// GET a collection and flatten it to a list
    #[command(alias = "ls")]
    List(ListArgs),

    /// Inspect resource schema metadata
    Schema(SchemaArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Request Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Don't store the token in the keyring or the endpoint in the config file
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Debug, Args)]
pub struct PathArgs {
    /// Resource path relative to the base endpoint (e.g. tenants/default)
    pub path: String,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Resource path relative to the base endpoint
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'Q', value_name = "KEY=VALUE")]
    pub query: Vec<String>,
}

#[derive(Debug, Args)]
pub struct BodyArgs {
    /// Resource path relative to the base endpoint
    pub path: String,

    /// Inline JSON body
    #[arg(long, short = 'd', conflicts_with = "from_file")]
    pub data: Option<String>,

    /// Read the JSON body from a file
    #[arg(long, short = 'f')]
    pub from_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BlobArgs {
    /// Resource path relative to the base endpoint
    pub path: String,

    /// Write to this file instead of stdout
    #[arg(long = "output-file", short = 'O')]
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Collection path relative to the base endpoint (e.g. extensions)
    pub path: String,

    /// Response key holding the array, if not `data` (e.g. tenants)
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    /// Show field detail for one resource
    pub resource: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration (secrets masked)
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
