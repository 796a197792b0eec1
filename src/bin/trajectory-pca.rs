//! trajectory-pca CLI - embed GPS trajectories with incremental PCA
//!
//! Usage:
//!   trajectory-pca -input porto.csv -output porto.json -c 50
//!   trajectory-pca --input porto.csv --output porto.json --batch-size 1000
//!
//! The input holds one trajectory per record, as the first field of a
//! `;`-separated line with a header. The output maps `xn` to an `N × c`
//! array of embeddings in input order.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use trajectory_pca::{InputFormat, PcaConfig, RunConfig, DEFAULT_BATCH_SIZE, DEFAULT_N_COMPONENTS};

#[derive(Parser, Debug)]
#[command(name = "trajectory-pca")]
#[command(about = "Reduce GPS trajectories to fixed-size embeddings with incremental PCA", long_about = None)]
struct Cli {
    /// Input CSV file, one trajectory per record
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON file for the embeddings
    #[arg(short, long)]
    output: PathBuf,

    /// Number of principal components to keep
    #[arg(short = 'c', long = "components", default_value_t = DEFAULT_N_COMPONENTS)]
    components: usize,

    /// Trajectories per incremental update
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Field delimiter of the input records
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Treat the first record as data instead of a header
    #[arg(long)]
    no_header: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig::new(&self.input, &self.output)
            .with_format(
                InputFormat::default()
                    .with_delimiter(self.delimiter)
                    .with_header(!self.no_header),
            )
            .with_pca(
                PcaConfig::default()
                    .with_n_components(self.components)
                    .with_batch_size(self.batch_size),
            )
    }
}

/// Rewrite single-dash long flags (`-input`, `-output`) into `--input`,
/// `--output` so the classic invocation keeps working.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-input") => OsString::from("--input"),
            Some("-output") => OsString::from("--output"),
            _ => arg,
        })
        .collect()
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    match trajectory_pca::run(&cli.run_config()) {
        Ok(summary) => {
            println!(
                "Embedded {} trajectories (dim {}) into {} components over {} batches",
                summary.n_trajectories, summary.dim, summary.rank, summary.batches
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_user_error() => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Unexpected error: {e:?}");
            eprintln!("Unexpected error: {e}");
            ExitCode::FAILURE
        }
    }
}
