#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lncd_core::SourceKind;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use command::{
    CommandStrategy, InfoStrategy, InitStrategy, LicenseStrategy, ParseInput, ParseStrategy,
    RunInput, RunStrategy, Settings, StatsInput, StatsStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "lncd")]
#[command(about = "License non-compliance detection for cited datasets", long_about = None)]
struct Cli {
    /// Config file (default: ~/lncd/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Artifact directory, overriding the configured one
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Show configuration
    Info,
    /// Show version
    Version,
    /// Parse a dataset record file
    Parse {
        file: PathBuf,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Formalize the license of a dataset record
    License { file: PathBuf },
    /// Run the full detection workflow for a dataset record
    Run {
        file: PathBuf,

        /// Sources to search (repeatable; default: configured sources)
        #[arg(short, long = "source")]
        sources: Vec<SourceKind>,

        /// Skip the citing-paper open-source check
        #[arg(long)]
        skip_open_source: bool,
    },
    /// Violation and filtering statistics over saved artifacts
    Stats {
        /// Only this source (default: all)
        #[arg(short, long)]
        source: Option<SourceKind>,

        /// Only this dataset keyword (default: all)
        #[arg(short, long)]
        keyword: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let settings = Settings {
        config: cli.config,
        output: cli.output,
    };

    match cli.command {
        Commands::Init => InitStrategy.execute(settings).await,
        Commands::Info => InfoStrategy.execute(settings).await,
        Commands::Version => VersionStrategy.execute(()).await,
        Commands::Parse { file, json } => ParseStrategy.execute(ParseInput { file, json }).await,
        Commands::License { file } => LicenseStrategy.execute((settings, file)).await,
        Commands::Run {
            file,
            sources,
            skip_open_source,
        } => {
            RunStrategy
                .execute(RunInput {
                    settings,
                    file,
                    sources,
                    skip_open_source,
                })
                .await
        }
        Commands::Stats { source, keyword } => {
            StatsStrategy
                .execute(StatsInput {
                    settings,
                    source,
                    keyword,
                })
                .await
        }
    }
}
