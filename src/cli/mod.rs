//! Command-line interface definition and dispatch for ctxprobe.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; the end-of-run table lives in the [`summary`] submodule.

mod summary;

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config;
use crate::endpoint::OllamaClient;
use crate::output::StdoutProgress;
use crate::report::RunReport;
use crate::search::Controller;

/// Top-level CLI structure for ctxprobe.
///
/// Parsed from command-line arguments via [`clap::Parser`]. Contains a single
/// required subcommand that determines which action ctxprobe performs.
#[derive(Parser)]
#[command(
    name = "ctxprobe",
    about = "Discover the real context and output limits of an LLM server"
)]
pub struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the ctxprobe CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Probe models for their real context and output limits
    Probe {
        /// Models to probe (defaults to the configured model)
        models: Vec<String>,
        /// Also discover the output limit and chart performance
        #[arg(short, long)]
        comprehensive: bool,
        /// Probe every model installed on the server
        #[arg(long)]
        all_installed: bool,
        /// Where to write the JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Server base URL (overrides config and CTXPROBE_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
        /// Per-probe timeout in seconds for context probes
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List models installed on the server
    Models {
        /// Server base URL (overrides config and CTXPROBE_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current config
    Show,
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Probe {
            models,
            comprehensive,
            all_installed,
            output,
            base_url,
            timeout,
        } => {
            let mut config = config::Config::load()?;
            if let Some(secs) = timeout {
                config.search.context_timeout_secs = Some(secs);
            }
            let params = config.search_params()?;
            let base_url = base_url.unwrap_or_else(|| config.base_url());
            let client = OllamaClient::new(&base_url, config.metadata_timeout())?;

            let mut models = models;
            if all_installed {
                for name in client.installed_models().await? {
                    if !models.contains(&name) {
                        models.push(name);
                    }
                }
            }
            if models.is_empty() {
                models.push(config.model.clone());
            }

            println!("{}", "=".repeat(60));
            println!("{}", "LLM CONTEXT CAPACITY PROBE".bold());
            println!("{}", "=".repeat(60));
            println!("Started:  {}", Local::now().to_rfc3339());
            println!("Endpoint: {}", base_url.cyan());
            println!("Models:   {}", models.join(", ").yellow());
            if comprehensive {
                println!("Mode:     comprehensive (output limit + performance)");
            }

            let mut progress = StdoutProgress::new();
            let report = {
                let mut controller = Controller::new(&client, params, &mut progress);
                controller.run(&models, comprehensive).await
            };

            summary::print_summary(&report);
            println!();
            println!("{}", format!("[{} probes]", progress.probe_count()).dimmed());

            let path = match output {
                Some(path) => path,
                None => RunReport::default_path()?,
            };
            report.write(&path)?;
            println!("Results saved to: {}", path.display().to_string().green());
            Ok(())
        }
        Commands::Models { base_url } => {
            let config = config::Config::load()?;
            let base_url = base_url.unwrap_or_else(|| config.base_url());
            let client = OllamaClient::new(&base_url, config.metadata_timeout())?;
            let models = client.installed_models().await?;

            println!("Installed models at {}:\n", base_url.cyan());
            if models.is_empty() {
                println!("  {}", "(no models found -- run `ollama pull <model>`)".dimmed());
            }
            for model in &models {
                let marker = if *model == config.model { " (default)" } else { "" };
                println!("  {model}{marker}");
            }
            Ok(())
        }
        Commands::Config { action } => {
            let config = config::Config::load()?;
            match action {
                ConfigAction::Show => {
                    let path = config::Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!("{} {}", "Endpoint:".bold(), config.base_url());
                    println!();
                    let toml_str = toml::to_string_pretty(&config)?;
                    println!("{}", toml_str);
                }
            }
            Ok(())
        }
    }
}
