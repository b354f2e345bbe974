//! Wayfarer LifeLog command line entry point.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, TimeZone};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use wayfarer_lifelog::{Timestamp, DEFAULT_WINDOW_DAYS};
use wayfarer_lifelog_cli::config::{Settings, ZoneSetting};
use wayfarer_lifelog_cli::session::LifeLogSessionManager;
use wayfarer_lifelog_cli::transport::StdioWatcher;
use wayfarer_lifelog_cli::TextChart;

#[derive(Parser)]
#[command(
    name = "wayfarer-lifelog",
    about = "Record Wayfarer account snapshots and summarize daily progress",
    version
)]
struct Cli {
    /// Path to the lifelog store file.
    #[arg(short, long, global = true)]
    store: Option<String>,

    /// UTC offset whose midnights delimit days (e.g. +09:00).
    #[arg(long, global = true, allow_hyphen_values = true)]
    utc_offset: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest newline-delimited {"url", "body"} responses from stdin (default).
    Watch {
        /// Account to attribute profile responses to before any properties
        /// response arrives.
        #[arg(long)]
        id: Option<String>,
    },

    /// Ingest a single response body.
    Ingest {
        /// Endpoint the body was returned from.
        #[arg(long)]
        url: String,

        /// File holding the body. Reads stdin when absent.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Account to attribute a profile response to.
        #[arg(long)]
        id: Option<String>,
    },

    /// Print the daily summaries of an account.
    Summary {
        /// Account email.
        #[arg(long)]
        id: String,

        /// Number of days in the window.
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        days: u32,

        /// Last day of the window as an RFC 3339 timestamp. Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the pages of an account that touch a calendar day.
    Pages {
        /// Account email.
        #[arg(long)]
        id: String,

        /// Day as YYYY-MM-DD.
        #[arg(long)]
        day: NaiveDate,
    },

    /// Print the whole store as JSON.
    Export,

    /// Validate the store file.
    Validate,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   wayfarer-lifelog completions bash > ~/.local/share/bash-completion/completions/wayfarer-lifelog
    ///   wayfarer-lifelog completions zsh > ~/.zfunc/_wayfarer-lifelog
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or(Commands::Watch { id: None });

    if let Commands::Completions { shell } = command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "wayfarer-lifelog", &mut std::io::stdout());
        return Ok(());
    }

    let settings = Settings::resolve(cli.store.as_deref(), cli.utc_offset.as_deref())?;
    match settings.zone {
        ZoneSetting::Fixed(offset) => run(command, &settings.store_path, offset).await,
        ZoneSetting::Local => run(command, &settings.store_path, Local).await,
    }
}

async fn run<Tz>(command: Commands, store_path: &Path, zone: Tz) -> anyhow::Result<()>
where
    Tz: TimeZone + std::fmt::Debug,
{
    let session = LifeLogSessionManager::open(store_path, zone.clone())?;

    match command {
        Commands::Watch { id } => {
            tracing::info!("Store: {} (zone {zone:?})", store_path.display());
            let mut ingestor = session.ingestor(TextChart::stdout(zone));
            if let Some(id) = id {
                ingestor = ingestor.with_identity(id);
            }
            let mut watcher = StdioWatcher::new(ingestor);
            watcher.run().await?;
        }

        Commands::Ingest { url, file, id } => {
            let body = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut body = String::new();
                    std::io::stdin().read_to_string(&mut body)?;
                    body
                }
            };
            let mut ingestor = session.ingestor(TextChart::stdout(zone));
            if let Some(id) = id {
                ingestor = ingestor.with_identity(id);
            }
            let outcome = ingestor.handle(&url, &body)?;
            eprintln!("{outcome:?}");
        }

        Commands::Summary { id, days, at, json } => {
            let at = match at {
                Some(text) => Timestamp::parse(&text)?,
                None => Timestamp::now(),
            };
            let rows = session.summaries(&id, at, days)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{:<10} {:<10} {:>9} {:>9}", "date", "day", "finished", "agreement");
                for row in rows {
                    let agreement = row
                        .agreement
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<10} {:<10} {:>9} {agreement:>9}",
                        row.date, row.weekday, row.finished
                    );
                }
            }
        }

        Commands::Pages { id, day } => {
            let pages = session.pages_for_day(&id, day)?;
            println!("{}", serde_json::to_string_pretty(&pages)?);
        }

        Commands::Export => {
            println!("{}", session.export()?);
        }

        Commands::Validate => match session.validate() {
            Ok(report) => {
                println!("Valid store file: {}", report.path);
                println!("  Identities: {}", report.identities.len());
                println!("  Pages: {}", report.page_count());
                for (id, pages) in &report.identities {
                    println!("    {id}: {pages}");
                }
            }
            Err(e) => {
                eprintln!("Invalid store file: {e}");
                std::process::exit(e.exit_code());
            }
        },

        Commands::Completions { .. } => {}
    }

    Ok(())
}
