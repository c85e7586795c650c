//! Entry point for ctxprobe, a capacity discovery tool for local LLM servers.
//!
//! This binary loads environment variables, parses CLI arguments via [`cli`],
//! sets up logging, and dispatches to the appropriate subcommand handler.

mod classify;
mod cli;
mod config;
mod constants;
mod endpoint;
mod format;
mod output;
mod probe;
mod profile;
mod prompt;
mod report;
mod search;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "ctxprobe=debug"
    } else {
        "ctxprobe=info"
    }
}

/// Runs the ctxprobe CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`]. Logs go to stderr so the probe log and
/// summary on stdout stay clean; `RUST_LOG` overrides `--verbose`.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    cli::run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regime_decisions_are_logged_by_default() {
        assert_eq!(default_filter(false), "ctxprobe=info");
        assert_eq!(default_filter(true), "ctxprobe=debug");
    }
}
