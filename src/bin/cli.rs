//! uma-watch CLI
//!
//! Local execution entry point. One invocation is one monitoring run;
//! scheduling belongs to cron or a CI workflow.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uma_watch::{
    error::{AppError, Result},
    models::Config,
    outputs,
    pipeline::{run_monitor, RunOptions, SearchIdentity},
    storage::{LocalBlobStore, StateStore},
};

/// uma-watch - trainer database search monitor
#[derive(Parser, Debug)]
#[command(name = "uma-watch", version, about = "Trainer database search monitor")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Directory holding persisted search state
    #[arg(long, default_value = "state")]
    state_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every configured search once
    Run {
        /// Compute deltas but skip state writes and notifications
        #[arg(long)]
        dry_run: bool,

        /// Skip state writes only
        #[arg(long)]
        no_commit: bool,

        /// Skip notifications only
        #[arg(long)]
        no_deliver: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show persisted state for one search
    State {
        /// Site identifier
        #[arg(long)]
        site: String,

        /// Search name
        #[arg(long)]
        search: String,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run {
            dry_run,
            no_commit,
            no_deliver,
        } => {
            let config = Config::load(&cli.config)?;
            config.validate()?;
            log::info!(
                "Loaded configuration from {} ({} site(s))",
                cli.config.display(),
                config.sites.len()
            );

            let options = RunOptions {
                commit_state: !(dry_run || no_commit),
                deliver: !(dry_run || no_deliver),
            };
            if dry_run {
                log::info!("Dry run: state writes and notifications disabled");
            }

            // Outputs need their credentials only when they will be used.
            let notifiers = if options.deliver {
                outputs::build_registry(&config.outputs, &config.run)?
            } else {
                Vec::new()
            };
            if options.deliver && notifiers.is_empty() {
                log::warn!("No outputs configured; deltas will only be logged");
            }

            let store = StateStore::new(LocalBlobStore::new(&cli.state_dir));
            let report = run_monitor(&config, &store, &notifiers, options).await?;

            if report.failures > 0 {
                log::warn!("{} search(es) failed this run", report.failures);
            }
        }

        Command::Validate => {
            let config = Config::load(&cli.config)?;
            config.validate()?;
            log::info!(
                "Config OK: {} site(s), {} search(es), {} output(s), whitelist {:?}",
                config.sites.len(),
                config.sites.iter().map(|s| s.searches.len()).sum::<usize>(),
                config.outputs.len(),
                config.whitelist
            );
        }

        Command::State { site, search } => {
            let config = Config::load_or_default(&cli.config);
            let url = config
                .sites
                .iter()
                .filter(|s| s.site_id == site)
                .flat_map(|s| &s.searches)
                .find(|s| s.name == search)
                .map(|s| s.url.clone())
                .unwrap_or_default();

            let identity = SearchIdentity::resolve(&site, &search, &url);
            let store = StateStore::new(LocalBlobStore::new(&cli.state_dir));

            match store.load(&identity).await {
                Ok(Some(state)) => {
                    log::info!("State for {identity}:");
                    log::info!("  url:      {}", state.search_url);
                    log::info!("  seeded:   {}", state.seeded);
                    log::info!("  entries:  {}", state.entry_count());
                    log::info!("  created:  {}", state.created_at);
                    if let Some(updated) = state.updated_at {
                        log::info!("  updated:  {}", updated);
                    }
                }
                Ok(None) => {
                    log::info!("No state for {identity} (never seen)");
                }
                Err(AppError::StateCorrupt(message)) => {
                    log::error!("State for {identity} is corrupt: {message}");
                    log::error!("The next run will reseed it.");
                }
                Err(error) => return Err(error),
            }
        }
    }

    Ok(())
}
