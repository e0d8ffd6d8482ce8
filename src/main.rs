use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;

use promptbudget::cli::{Cli, ColorMode, Command};
use promptbudget::commands;
use promptbudget::commands::init::{InitOptions, InitResult};
use promptbudget::commands::process::{ProcessCommandOptions, PromptSource};
use promptbudget::error::PromptBudgetError;

fn main() {
    let cli = Cli::parse();

    // Configure color output
    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    // Init tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), PromptBudgetError> {
    match cli.command {
        Command::Init { root, force } => {
            let root = resolve_root(root)?;
            let result = commands::init::run(InitOptions {
                root,
                config_path: cli.config,
                force,
            })?;
            if !cli.quiet {
                print_init_result(&result);
            }
            Ok(())
        }
        Command::Process {
            prompt,
            file,
            model,
            limit,
            format,
            decode,
        } => {
            let source = match (prompt, file) {
                (Some(text), _) => PromptSource::Inline(text),
                (None, Some(path)) => PromptSource::File(path),
                (None, None) => PromptSource::Stdin,
            };
            commands::process::run(ProcessCommandOptions {
                source,
                model,
                limit,
                format,
                decode,
                quiet: cli.quiet,
                config_path: cli.config,
            })
        }
    }
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf, PromptBudgetError> {
    match root {
        Some(p) => Ok(p),
        None => std::env::current_dir()
            .map_err(|e| PromptBudgetError::io("getting current directory", e)),
    }
}

fn print_init_result(result: &InitResult) {
    println!(
        "{} Created config at {}",
        "ok".green().bold(),
        result.config_path.display()
    );
    println!(
        "  model = {}, token_limit = {}",
        result.config.model, result.config.token_limit
    );
    println!();
    println!(
        "Run {} to fit a prompt into the budget",
        "promptbudget process \"<prompt>\"".bold()
    );
}
