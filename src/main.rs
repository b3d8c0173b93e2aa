use clap::{Parser, Subcommand};
use hmda_loader::runner::{
    ClosedFilter, DEFAULT_BATCH_SIZE, DEFAULT_DATABASE_PATH, DEFAULT_LENDER_FILE,
    DEFAULT_LOAN_FILE, DEFAULT_OUTPUT_DIR, DEFAULT_PULL_THROUGH_DIR, Dataset, LoadArgs,
    LoanTypeSelection, ReportArgs, VolumeOptions, run_load, run_pull_through, run_volume,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Clone)]
#[command(version, about = "Load HMDA loan and lender files into SQLite and report on them")]
struct Args {
    /// SQLite database file
    #[arg(short, long, global = true, default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    /// Quiet mode - minimal output, only show summary
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Subcommand)]
enum Command {
    /// Replace the loan table with the contents of a loan-level file
    LoadLoans {
        /// Pipe-delimited loan file without a header row
        #[arg(short, long, default_value = DEFAULT_LOAN_FILE)]
        source: PathBuf,

        /// Rows per INSERT statement
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Replace the lender table with the contents of a transmittal sheet file
    LoadLenders {
        /// Pipe-delimited lender panel file with a header row
        #[arg(short, long, default_value = DEFAULT_LENDER_FILE)]
        source: PathBuf,

        /// Rows per INSERT statement
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Pull-through rate by lender, year and loan type
    PullThrough {
        #[arg(short, long, default_value = DEFAULT_PULL_THROUGH_DIR)]
        output_dir: PathBuf,
    },

    /// Loan counts and amounts by lender, year, loan type and state
    Volume {
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Count every application outcome, not only closed loans
        #[arg(long)]
        all_statuses: bool,

        /// total, all, or a loan type code 1-4
        #[arg(short, long, default_value = "all")]
        loan_type: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.quiet);

    match args.command.clone() {
        Command::LoadLoans { source, batch_size } => {
            load(&args, Dataset::Loans, source, batch_size).await
        }
        Command::LoadLenders { source, batch_size } => {
            load(&args, Dataset::Lenders, source, batch_size).await
        }
        Command::PullThrough { output_dir } => {
            let report = ReportArgs::new(&args.database, output_dir);
            finish_report(run_pull_through(report).await)
        }
        Command::Volume {
            output_dir,
            all_statuses,
            loan_type,
        } => {
            let loan_types = match LoanTypeSelection::parse(&loan_type) {
                Ok(selection) => selection,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let options = VolumeOptions {
                closed: ClosedFilter::from_closed_only(!all_statuses),
                loan_types,
            };
            if !args.quiet {
                match options.closed {
                    ClosedFilter::ClosedOnly => {
                        println!("Restricting analysis to closed loans (action_taken 1 or 6)")
                    }
                    ClosedFilter::AllStatuses => {
                        println!("Including all loan applications and statuses")
                    }
                }
            }
            let report = ReportArgs::new(&args.database, output_dir);
            finish_report(run_volume(report, options).await)
        }
    }
}

fn init_tracing(quiet: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = if quiet {
        EnvFilter::new("hmda_loader=warn,sqlx=off")
    } else {
        EnvFilter::new("hmda_loader=info,sqlx=off")
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn load(args: &Args, dataset: Dataset, source: PathBuf, batch_size: usize) -> ExitCode {
    let table = dataset.table_name();

    if !args.quiet {
        println!("HMDA Loader");
        println!("===========");
        println!("Database: {}", args.database.display());
        println!("Source: {}", source.display());
        println!("Table: {}", table);
        println!();
    }

    let load_args = LoadArgs {
        database_path: args.database.clone(),
        source_path: source,
        dataset,
        batch_size,
        quiet: args.quiet,
    };

    match run_load(load_args).await {
        Ok(result) => {
            println!();
            println!("Load Summary");
            println!("============");
            println!("Load ID: {}", result.load_id);
            println!("Started: {}", result.started_at);
            println!("Table: {}", result.table);
            println!("Records loaded: {}", result.records_loaded);
            println!("Bytes read: {}", result.bytes_read);
            println!("Duration: {:.2}s", result.duration.as_secs_f64());
            let secs = result.duration.as_secs_f64();
            if secs > 0.0 {
                println!(
                    "Throughput: {:.2} records/sec",
                    result.records_loaded as f64 / secs
                );
            }
            if let (Some(p50), Some(p90), Some(p99)) = result.batch_percentiles_ms {
                println!("Batch latency (ms): p50={} p90={} p99={}", p50, p90, p99);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!();
            eprintln!("Load of '{}' failed [{}]", table, e.kind());
            eprintln!("  {}", e);
            ExitCode::FAILURE
        }
    }
}

fn finish_report(result: anyhow::Result<Vec<PathBuf>>) -> ExitCode {
    match result {
        Ok(files) => {
            for file in files {
                println!("Exported: {}", file.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Report failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
