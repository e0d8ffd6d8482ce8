use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "promptbudget",
    about = "Fit LLM prompts into a token budget",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default config file
    Init {
        /// Directory to write promptbudget.toml into
        #[arg(long)]
        root: Option<PathBuf>,

        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Normalize, encode, count and truncate a prompt
    #[command(alias = "p")]
    Process {
        /// Prompt text (reads stdin when omitted and no --file is given)
        prompt: Option<String>,

        /// Read the prompt from a file
        #[arg(long, conflicts_with = "prompt")]
        file: Option<PathBuf>,

        /// Model whose vocabulary is used
        #[arg(long, env = "PROMPTBUDGET_MODEL")]
        model: Option<String>,

        /// Maximum tokens to keep
        #[arg(long, env = "PROMPTBUDGET_TOKEN_LIMIT", allow_negative_numbers = true)]
        limit: Option<i64>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,

        /// Print the truncated prompt text
        #[arg(long)]
        decode: bool,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}
