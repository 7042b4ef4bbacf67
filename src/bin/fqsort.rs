use std::process;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use qsort_rs::common::{io_error_msg, reset_sigpipe};
use qsort_rs::qsort::{LineSortConfig, SortConfig, parse_worker_count, sort_and_output};

#[derive(Parser)]
#[command(
    name = "fqsort",
    version,
    about = "Sort lines of text files with a work-stealing parallel quicksort"
)]
struct Cli {
    /// Compare according to string numerical value
    #[arg(short = 'n', long = "numeric-sort")]
    numeric_sort: bool,

    /// Reverse the result of comparisons
    #[arg(short = 'r', long = "reverse")]
    reverse: bool,

    /// Line delimiter is NUL, not newline
    #[arg(short = 'z', long = "zero-terminated")]
    zero_terminated: bool,

    /// Check for sorted input; do not sort
    #[arg(short = 'c', long = "check")]
    check: bool,

    /// Write result to FILE instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<String>,

    /// Cap on background sort threads (default: CPUs - 1, or $FQSORT_MAX_WORKERS)
    #[arg(long = "max-workers", value_name = "N")]
    max_workers: Option<String>,

    /// Log sort session statistics to stderr
    #[arg(long = "stats")]
    stats: bool,

    /// Files to sort; with no FILE, or when FILE is -, read standard input
    files: Vec<String>,
}

fn init_tracing(stats: bool) {
    let default = if stats { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut sort = SortConfig::from_env();
    if let Some(ref n) = cli.max_workers {
        sort.max_workers = Some(parse_worker_count(n)?);
    }

    let config = LineSortConfig {
        numeric: cli.numeric_sort,
        reverse: cli.reverse,
        zero_terminated: cli.zero_terminated,
        check: cli.check,
        stats: cli.stats,
        output_file: cli.output,
        sort,
    };

    sort_and_output(&cli.files, &config)
        .map_err(|e| anyhow::anyhow!(io_error_msg(&e)))
        .context("sort failed")
}

fn main() {
    reset_sigpipe();
    let cli = Cli::parse();
    init_tracing(cli.stats);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("fqsort: {:#}", e);
            process::exit(2);
        }
    }
}
