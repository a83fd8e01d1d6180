use std::process::ExitCode;

use clap::Parser;
use cl_samples::{cli::init_logging, run_copy, Args};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = run_copy(&args);

    #[cfg(feature = "metrics")]
    cl_samples::summary();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
