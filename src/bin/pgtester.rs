//! pgtester: run declarative tests against PostgreSQL
//!
//! Usage:
//!   pgtester [-d] tests/              # every file below tests/, sorted by name
//!   pgtester -v                       # print the version and exit
//!   cat tests.yml | pgtester          # read documents from stdin

use clap::Parser;
use pgtester::pgtester::test_harness::cli::{run, RunConfig};
use pgtester::pgtester::test_harness::logging;
use pgtester::pgtester::test_harness::OutputFormat;
use pgtester::pgtester::version::app_version;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pgtester")]
#[command(about = "Run declarative SQL tests against PostgreSQL")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Add debugging output
    #[arg(short, long)]
    debug: bool,

    /// Show version information
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Summary output format: text, json
    #[arg(long, default_value = "text")]
    output: OutputFormat,

    /// Test files or directories (stdin when omitted)
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", app_version());
        std::process::exit(0);
    }

    let log = logging::init_logger();
    let config = RunConfig::new(cli.paths)
        .with_debug(cli.debug)
        .with_output_format(cli.output);

    let code = run(&config, &log).await;
    std::process::exit(code);
}
