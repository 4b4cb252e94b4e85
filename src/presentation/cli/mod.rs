use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::use_cases::{RunOptions, RunSummary, SyncRun};
use crate::domain::entities::sync_config::AppConfig;
use crate::infrastructure::filesystem::config_store::{ConfigStore, CONFIG_ENV};
use crate::infrastructure::git::backend_factory::create_backend;
use crate::infrastructure::provider::factory::RestProviderFactory;

/// git-provider-sync - mirror repositories between git hosting providers
#[derive(Parser, Debug)]
#[command(name = "git-provider-sync")]
#[command(about = "Mirror repositories from a git hosting provider to remotes, directories or archives")]
#[command(version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GPS_GIT_HASH"),
    ", built ",
    env!("GPS_BUILD_DATE"),
    ")"
))]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mirror every configured source to its targets
    Sync {
        /// Force push to every target
        #[arg(short, long)]
        force_push: bool,

        /// Skip repositories whose name a target rejects instead of aborting
        #[arg(long)]
        ignore_invalid_name: bool,

        /// Use ASCII-sanitized repository names on every target
        #[arg(long)]
        ascii_name: bool,

        /// List the projects that would be mirrored without cloning or pushing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check the configuration file
    Validate,
}

impl Commands {
    pub fn run_options(&self) -> Option<RunOptions> {
        match self {
            Commands::Sync {
                force_push,
                ignore_invalid_name,
                ascii_name,
                dry_run,
            } => Some(
                RunOptions::default()
                    .with_force_push(*force_push)
                    .with_ignore_invalid_name(*ignore_invalid_name)
                    .with_ascii_name(*ascii_name)
                    .with_dry_run(*dry_run),
            ),
            Commands::Validate => None,
        }
    }
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
    cancel: CancellationToken,
}

impl CliApp {
    pub fn new(cli: Cli, cancel: CancellationToken) -> Self {
        Self { cli, cancel }
    }

    pub async fn run(self) -> Result<()> {
        colored::control::set_override(!self.cli.no_color);

        match self.handle_command().await {
            Ok(_) => Ok(()),
            Err(e) => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                exit(1);
            }
        }
    }

    async fn handle_command(&self) -> Result<()> {
        let config = self.load_config()?;
        match &self.cli.command {
            Commands::Validate => {
                print_config(&config);
                Ok(())
            }
            command @ Commands::Sync { .. } => {
                let options = command.run_options().unwrap_or_default();
                self.handle_sync_command(&config, &options).await
            }
        }
    }

    fn load_config(&self) -> Result<AppConfig> {
        let path = ConfigStore::resolve_path(self.cli.config.as_deref());
        let config = ConfigStore::new()
            .read_config(&path)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Ok(config)
    }

    async fn handle_sync_command(&self, config: &AppConfig, options: &RunOptions) -> Result<()> {
        let backend = create_backend(&config.git, &self.cancel).await?;
        let run = SyncRun::new(backend, Arc::new(RestProviderFactory::new()));

        if options.dry_run {
            println!("{} Dry run, nothing will be cloned or pushed", "::".blue().bold());
        } else {
            println!("{} Mirroring repositories...", "::".blue().bold());
        }

        let summaries = run.execute(config, options, &self.cancel).await?;
        print_summaries(&summaries, self.cli.verbose);
        println!("{} Mirroring completed!", "✓".green().bold());
        Ok(())
    }
}

fn print_config(config: &AppConfig) {
    println!("{} Configuration is valid", "✓".green().bold());
    println!("  Git engine: {}", config.git.engine);
    for sync in &config.configurations {
        println!(
            "  {} {}@{}",
            sync.source.provider_type.to_string().bold(),
            sync.source.owner,
            sync.source.domain
        );
        for (name, mirror) in &sync.mirrors {
            let location = match &mirror.provider.directory {
                Some(directory) => directory.display().to_string(),
                None => format!("{}@{}", mirror.provider.owner, mirror.provider.domain),
            };
            println!("    -> {} ({}) {}", name.cyan(), mirror.provider_type(), location);
        }
    }
}

fn print_summaries(summaries: &[RunSummary], verbose: bool) {
    for summary in summaries {
        println!(
            "{} {} -> {} ({})",
            "::".blue().bold(),
            summary.source,
            summary.mirror.cyan(),
            summary.target
        );
        println!("  Repositories listed: {}", summary.listed);
        println!("  Repositories processed: {}", summary.meta.total);

        let up_to_date = summary.meta.up_to_date();
        if !up_to_date.is_empty() {
            println!("  Already up to date: {}", up_to_date.len());
            if verbose {
                for name in up_to_date {
                    println!("    {}", name);
                }
            }
        }

        let invalid = summary.meta.invalid();
        if !invalid.is_empty() {
            println!("{} Skipped invalid names:", "⚠".yellow().bold());
            for name in invalid {
                println!("  {}", name.red());
            }
        }
    }
}
