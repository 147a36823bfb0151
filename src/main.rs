use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use hojokin_etl::config::AppConfig;
use hojokin_etl::pipeline::Pipeline;
use hojokin_etl::server;
use hojokin_etl::sources;
use hojokin_etl::storage::Repository;
use hojokin_etl::utils;

#[derive(Parser)]
#[command(name = "hojokin-etl", about = "Subsidy listing scraper and ETL", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape all configured targets (or one, with --source)
    Scrape {
        /// Only run the target with this id
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Run the HTTP trigger server
    Serve,

    /// Show database statistics and recent runs
    Stats,

    /// List configured scrape targets
    Sources,

    /// Apply schema migrations without scraping
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "hojokin_etl=info,warn",
        1 => "hojokin_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Scrape { source } => {
            let _t = utils::RunTimer::start("Scrape run");
            let pipeline = match source {
                Some(id) => Pipeline::new(config).filter_source(&id),
                None => Pipeline::new(config),
            };
            let stats = pipeline.run().await?;
            info!(
                "Done: {} targets ({} failed), {} records, {} record errors",
                stats.targets_processed,
                stats.targets_failed,
                stats.records_upserted,
                stats.record_errors,
            );
        }

        Command::Serve => {
            server::serve(config).await?;
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            let subsidies = repo.subsidy_count()?;
            let runs = repo.log_count()?;
            println!("─────────────────────────────────");
            println!("  hojokin-etl — Database Stats");
            println!("─────────────────────────────────");
            println!("  Subsidies : {}", utils::fmt_count(subsidies));
            println!("  Run logs  : {}", utils::fmt_count(runs));
            println!("─────────────────────────────────");
            for log in repo.latest_scrape_logs(5)? {
                println!(
                    "  {}  {:<8}  {:>4} records  {}",
                    log.started_at.format("%Y-%m-%d %H:%M"),
                    log.status.as_str(),
                    log.scraped_count,
                    log.source_name,
                );
                if let Some(err) = &log.error_message {
                    println!("      error: {}", err);
                }
            }
        }

        Command::Sources => {
            let targets = sources::builtin_targets();
            println!("{} targets:", targets.len());
            for t in &targets {
                println!("  {:<12}  {}  ({})", t.id, t.name, t.url);
            }
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}
