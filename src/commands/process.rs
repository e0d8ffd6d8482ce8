//! Handler for the `promptbudget process` command.
//!
//! Reads a prompt (argument, file, or stdin), applies config overrides,
//! runs it through the pipeline and prints the result.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config;
use crate::error::{PromptBudgetError, Result};
use crate::events::TracingSink;
use crate::pipeline::{ProcessingResult, PromptPipeline};

// ---------------------------------------------------------------------------
// Public interface
// ---------------------------------------------------------------------------

/// Where the prompt text comes from.
#[derive(Debug, Clone)]
pub enum PromptSource {
    Inline(String),
    File(PathBuf),
    Stdin,
}

/// All inputs needed to run the process command.
#[derive(Debug)]
pub struct ProcessCommandOptions {
    pub source: PromptSource,
    /// Model override (flag or environment).
    pub model: Option<String>,
    /// Token limit override (flag or environment).
    pub limit: Option<i64>,
    pub format: OutputFormat,
    /// Also decode the truncated tokens back to text.
    pub decode: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Path to config file.
    pub config_path: Option<PathBuf>,
}

/// JSON output: the pipeline result plus context about how it was made.
#[derive(Debug, Serialize)]
struct ProcessReport<'a> {
    model: &'a str,
    vocabulary: &'a str,
    token_limit: usize,
    #[serde(flatten)]
    result: &'a ProcessingResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncated_prompt: Option<&'a str>,
}

/// Run the process command.
pub fn run(options: ProcessCommandOptions) -> Result<()> {
    let mut config = config::load_or_default(options.config_path.as_deref())?;
    config.apply_overrides(options.model.clone(), options.limit);
    config.validate()?;

    let pipeline = PromptPipeline::from_config(&config, Arc::new(TracingSink))?;
    let prompt = read_prompt(&options.source)?;
    let result = pipeline.process(&prompt)?;
    let truncated_prompt = if options.decode {
        Some(pipeline.decode(&result.truncated_tokens)?)
    } else {
        None
    };

    match options.format {
        OutputFormat::Json => {
            let report = ProcessReport {
                model: &config.model,
                vocabulary: pipeline.vocabulary(),
                token_limit: pipeline.limit().get(),
                result: &result,
                truncated_prompt: truncated_prompt.as_deref(),
            };
            let json = serde_json::to_string_pretty(&report).map_err(|e| {
                PromptBudgetError::config_with_source("failed to serialize result", e)
            })?;
            println!("{json}");
        }
        OutputFormat::Plain => {
            print_plain(&config.model, &pipeline, &result, options.quiet);
            if let Some(text) = truncated_prompt {
                if !options.quiet {
                    println!();
                }
                println!("{text}");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_prompt(source: &PromptSource) -> Result<String> {
    match source {
        PromptSource::Inline(text) => Ok(text.clone()),
        PromptSource::File(path) => std::fs::read_to_string(path).map_err(|e| {
            PromptBudgetError::io(format!("reading prompt from '{}'", path.display()), e)
        }),
        PromptSource::Stdin => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| PromptBudgetError::io("reading prompt from stdin", e))?;
            Ok(buf)
        }
    }
}

fn print_plain(model: &str, pipeline: &PromptPipeline, result: &ProcessingResult, quiet: bool) {
    if quiet {
        println!("{} {}", result.count_before, result.count_after);
        return;
    }

    println!("{}", "Prompt Budget".bold());
    println!("  model:           {model}");
    println!("  vocabulary:      {}", pipeline.vocabulary());
    println!("  token limit:     {}", pipeline.limit());
    println!("  tokens before:   {}", result.count_before);
    println!("  tokens after:    {}", result.count_after);
    if result.was_truncated() {
        println!(
            "  {}",
            format!("truncated: dropped {} tokens", result.dropped()).yellow()
        );
    }
}
