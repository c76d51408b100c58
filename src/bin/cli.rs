//! learnwatch CLI
//!
//! Long-running watcher (`run`) plus one-shot maintenance commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use learnwatch::{
    app::{App, build_detector},
    error::{AppError, DetectError, Result},
    models::{Config, Item},
    pipeline::{CycleOutcome, Dispatcher, Scheduler},
};

/// learnwatch - new item notifier
#[derive(Parser, Debug)]
#[command(
    name = "learnwatch",
    version,
    about = "Watches a listing page and pushes new items to Telegram"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the snapshot file location
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Override the watched page URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check periodically and answer chat commands until interrupted
    Run,

    /// Run a single detection cycle
    Check {
        /// Push new items to the configured chat
        #[arg(long)]
        notify: bool,
    },

    /// Show the recorded snapshot
    Info,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Layer file, environment and command line settings.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_or_default(&cli.config);
    config.apply_env()?;
    if let Some(path) = &cli.store {
        config.storage.path = path.clone();
    }
    if let Some(url) = &cli.url {
        config.source.url = url.clone();
    }
    Ok(config)
}

fn print_items(items: &[Item]) {
    for item in items {
        println!("{}\n  {}", item.title, item.url);
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run => {
            let app = Arc::new(App::from_config(config)?);
            let scheduler = Scheduler::from_config(&app.config.schedule);
            let dispatcher = Dispatcher::from_app(&app);

            tokio::select! {
                _ = scheduler.run(Arc::clone(&app)) => {}
                _ = dispatcher.run(Arc::clone(&app)) => {}
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    log::info!("Interrupted, shutting down");
                }
            }
        }

        Command::Check { notify: true } => {
            let app = App::from_config(config)?;
            let scheduler = Scheduler::from_config(&app.config.schedule);
            match scheduler.run_cycle(&app).await {
                CycleOutcome::Notified(count) => log::info!("Pushed {} new item(s)", count),
                CycleOutcome::Quiet => log::info!("No new items"),
                CycleOutcome::Failed => {
                    return Err(AppError::notify("check failed, see log for details"));
                }
            }
        }

        Command::Check { notify: false } => {
            let detector = build_detector(&config)?;
            let new_items = match detector.detect().await {
                Ok(detection) => {
                    log::info!(
                        "Checked {} item(s) at {}",
                        detection.fetched,
                        detection.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                    detection.new_items
                }
                Err(DetectError::StoreWriteFailed { new_items, source }) => {
                    print_items(&new_items);
                    return Err(DetectError::StoreWriteFailed { new_items, source }.into());
                }
                Err(e) => return Err(e.into()),
            };

            if new_items.is_empty() {
                log::info!("No new items");
            }
            print_items(&new_items);
        }

        Command::Info => {
            let detector = build_detector(&config)?;
            log::info!("Watching: {}", detector.target());
            log::info!("Snapshot: {}", detector.store_location().await);

            let items = detector.snapshot().await?;
            if items.is_empty() {
                log::info!("No items recorded yet.");
            }
            print_items(items.as_slice());
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Source, schedule and selectors OK");

            match config.telegram.credentials() {
                Ok(_) => log::info!("✓ Telegram credentials present"),
                Err(e) => log::warn!("{} ('run' and 'check --notify' need it)", e),
            }
        }
    }

    Ok(())
}
