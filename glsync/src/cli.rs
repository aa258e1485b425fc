///
/// This module implements the CLI interface for glsync: command parsing,
/// wiring of the core pipeline, and user-visible output.
///
/// All pipeline logic (fetching, committing, pushing) lives in the
/// [`glsync-core`] crate. This module is strictly CLI glue.
///
/// ## How To Use
/// - For command-line users: run the `glsync` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`glsync-core`]: ../../glsync-core/
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glsync_core::fetcher::LeetCodeFetcher;
use glsync_core::git::GitRepository;
use glsync_core::leetcode::{HttpTransport, LeetCodeClient, QueryTemplates};
use glsync_core::Synchroniser;
use std::path::PathBuf;

/// CLI for glsync: sync accepted LeetCode submissions to a git repository.
#[derive(Parser)]
#[clap(
    name = "glsync",
    version,
    about = "Sync all your accepted LeetCode submissions to a git repository, one commit per problem"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every accepted submission and push one commit per problem.
    ///
    /// Requires LEETCODE_SESSION in the environment (or a .env file).
    Sync {
        /// Path to an optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Git repository to push submissions to; overrides `repo_url` from the config file
        #[clap(long)]
        repo_url: Option<String>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, repo_url } => {
            let config = load_config(config.as_deref(), repo_url)?;
            tracing::info!(command = "sync", "Starting synchronisation process");

            let transport = HttpTransport::new(
                config.endpoint.clone(),
                config.session_cookie.clone(),
                config.bearer_token.clone(),
            )
            .context("Failed to build the HTTP client")?;
            let client = LeetCodeClient::new(transport, QueryTemplates::default(), config.retry);
            let fetcher = LeetCodeFetcher::new(client);
            let repository = GitRepository::open(&config.repo_url, &config.workdir)
                .with_context(|| format!("Failed to open repository {}", config.repo_url))?;

            match Synchroniser::new(fetcher, repository).execute().await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Synchronisation complete");
                    println!(
                        "Synchronise complete: {} fetched, {} committed, {} unchanged, {} already synced, {} failed",
                        report.fetched,
                        report.committed,
                        report.unchanged,
                        report.already_synced,
                        report.failed.len()
                    );
                    for failed in &report.failed {
                        println!("  question {}: {}", failed.question_id, failed.error);
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e).context("Synchronisation failed"))
                }
            }
        }
    }
}
