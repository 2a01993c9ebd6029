//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "graft",
    bin_name = "graft",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Composable project generators with reviewable patches",
    long_about = "Graft runs project generators against an existing project, \
                  merges their edits into one change set, shows the diff, \
                  and applies it atomically.",
    after_help = "EXAMPLES:\n\
        \x20 graft run project --description \"A demo\"\n\
        \x20 graft run --dry-run config-append --key plugins --value Foo\n\
        \x20 graft run readme,gitignore --title Demo --entry .cache\n\
        \x20 graft list\n\
        \x20 graft completions bash > /usr/share/bash-completion/completions/graft",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Plan, review and apply one or more generators.
    #[command(
        visible_alias = "r",
        about = "Run generators against a project",
        after_help = "Run options go before the generator list; everything after \
                      it is passed to the generators.\n\n\
                      EXAMPLES:\n\
            \x20 graft run readme --title \"My App\"\n\
            \x20 graft run --yes --project ../app config-set --key name --value app\n\
            \x20 graft run --dry-run project,readme --docs.description Hi"
    )]
    Run(RunArgs),

    /// List registered generators.
    #[command(
        visible_alias = "ls",
        about = "List available generators",
        after_help = "EXAMPLES:\n\
            \x20 graft list\n\
            \x20 graft list --format json"
    )]
    List(ListArgs),

    /// Show one generator's flags, group and composition.
    #[command(about = "Describe a generator")]
    Describe(DescribeArgs),

    /// Show the flag namespace a set of generators resolves to.
    #[command(
        about = "Show resolved flags",
        after_help = "EXAMPLES:\n\
            \x20 graft flags project\n\
            \x20 graft flags config-set readme"
    )]
    Flags(FlagsArgs),

    /// Initialise a Graft configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 graft init\n\
            \x20 graft init --force"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 graft completions bash > ~/.local/share/bash-completion/completions/graft\n\
            \x20 graft completions zsh  > ~/.zfunc/_graft\n\
            \x20 graft completions fish > ~/.config/fish/completions/graft.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Graft configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 graft config get output.diff_context\n\
            \x20 graft config list\n\
            \x20 graft config path"
    )]
    Config(ConfigCommands),
}

// ── run ───────────────────────────────────────────────────────────────────────

/// Arguments for `graft run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Comma-separated generator ids.
    #[arg(value_name = "GENERATORS")]
    pub generators: String,

    /// Positional values and flags for the generators.
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,

    /// Project directory (default: current directory).
    #[arg(short = 'p', long = "project", value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long = "yes", help = "Apply without asking")]
    pub yes: bool,

    /// Show the diff without writing anything.
    #[arg(long = "dry-run", help = "Show what would change without changing it")]
    pub dry_run: bool,

    /// Extra generators directory, ahead of the configured one.
    #[arg(long = "generators-dir", value_name = "DIR")]
    pub generators_dir: Option<PathBuf>,
}

// ── list ──────────────────────────────────────────────────────────────────────

/// Arguments for `graft list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,

    /// Extra generators directory.
    #[arg(long = "generators-dir", value_name = "DIR")]
    pub generators_dir: Option<PathBuf>,
}

/// Output format for the `list` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One id per line.
    List,
    /// JSON array.
    Json,
    /// CSV rows.
    Csv,
}

// ── describe / flags ──────────────────────────────────────────────────────────

/// Arguments for `graft describe`.
#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Generator id.
    #[arg(value_name = "GENERATOR")]
    pub generator: String,

    #[arg(long = "generators-dir", value_name = "DIR")]
    pub generators_dir: Option<PathBuf>,
}

/// Arguments for `graft flags`.
#[derive(Debug, Args)]
pub struct FlagsArgs {
    /// Generator ids; commas and spaces both separate.
    #[arg(value_name = "GENERATORS", value_delimiter = ',', required = true, num_args = 1..)]
    pub generators: Vec<String>,

    #[arg(long = "generators-dir", value_name = "DIR")]
    pub generators_dir: Option<PathBuf>,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `graft init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `graft completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `graft config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `output.diff_context`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────
