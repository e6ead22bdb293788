//! Virk CLI binary.
//!
//! Extracts the CVR company registry, published financial statements and
//! their XBRL annual reports into parquet datasets.

mod integration;

use clap::{Parser, Subcommand};
use integration::companies::{CompanyJob, fetch_companies};
use integration::documents::{DocumentJob, transform_documents};
use integration::folders::dataset_folder;
use integration::statements::{StatementJob, fetch_statements};
use std::path::PathBuf;
use std::process;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};
use virk::{Dataset, OutputMode};
use virk_data::config::HttpConfig;
use virk_data::search::{SearchClient, YearRange};
use virk_data::xbrl::{DEFAULT_BATCH_SIZE, DocumentClient};
use virk_data::VirkConfig;
use virk_output::{ExportFormat, RunReport};

#[derive(Parser)]
#[command(name = "virk")]
#[command(about = "Virk: CVR registry extraction into panel datasets", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level, overriding RUST_LOG
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download company records
    Companies {
        /// Only companies last updated in this year
        #[arg(long)]
        year: Option<i32>,

        /// Output format (parquet or json)
        #[arg(long, default_value = "parquet")]
        format: ExportFormat,

        /// Table layout (panel or wide)
        #[arg(long, default_value = "panel")]
        mode: OutputMode,

        /// Rename columns and status codes to English
        #[arg(long)]
        translate: bool,

        /// Output folder, defaults to $COMPANY_DATA_FOLDER_PATH
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Download published financial statements
    Statements {
        /// Only statements whose accounting period touches this year
        #[arg(long)]
        year: Option<i32>,

        /// Output format (parquet or json)
        #[arg(long, default_value = "parquet")]
        format: ExportFormat,

        /// Output folder, defaults to $FS_FOLDER_PATH
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Parse the XBRL annual reports of one or more years
    Documents {
        /// Year, or first and last year
        #[arg(long, num_args = 1..=2, required = true, value_names = ["YEAR", "END"])]
        years: Vec<i32>,

        /// Documents fetched concurrently per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Folder holding financial_statements.parquet, defaults to $FS_FOLDER_PATH
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Output folder, defaults to $EFS_FOLDER_PATH
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Companies {
            year,
            format,
            mode,
            translate,
            output_dir,
        } => {
            let client = SearchClient::from_config(VirkConfig::from_env()?)?;
            let job = CompanyJob {
                year,
                format,
                mode,
                translate,
                output_dir: dataset_folder(Dataset::Companies, output_dir),
            };
            let report = fetch_companies(&client, &job).await?;
            print_report(&report);
        }
        Commands::Statements {
            year,
            format,
            output_dir,
        } => {
            let client = SearchClient::from_config(VirkConfig::from_env()?)?;
            let job = StatementJob {
                year,
                format,
                output_dir: dataset_folder(Dataset::Statements, output_dir),
            };
            let report = fetch_statements(&client, &job).await?;
            print_report(&report);
        }
        Commands::Documents {
            years,
            batch_size,
            input_dir,
            output_dir,
        } => {
            let (&start, rest) = years.split_first().ok_or("--years needs a year")?;
            let years = YearRange::new(start, rest.first().copied())?;
            let job = DocumentJob {
                years,
                batch_size,
                input_dir: dataset_folder(Dataset::Statements, input_dir),
                output_dir: dataset_folder(Dataset::StatementDetails, output_dir),
            };
            let source = DocumentClient::new(&HttpConfig::default())?;
            let reports = transform_documents(source, &job).await?;
            for report in &reports {
                print_report(report);
            }
            if reports.len() < years.len() {
                warn!(
                    failed = years.len() - reports.len(),
                    "some years failed, see the log above"
                );
            }
        }
    }

    Ok(())
}

/// Log to stderr, `virk=info` unless RUST_LOG or `--verbose` says otherwise.
fn init_tracing(verbose: bool) {
    let default = if verbose { "virk=debug" } else { "virk=info" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn print_report(report: &RunReport) {
    println!();
    print!("{}", report.summary());
    for path in &report.files {
        println!("  -> {}", path.display());
    }
}
