use std::process::ExitCode;

use clap::Parser;
use cl_samples::{cli::init_logging, run_copy_kernel, Args, KernelRun};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = run_copy_kernel(&args);

    #[cfg(feature = "metrics")]
    cl_samples::summary();

    match result {
        // A rejected build is reported but still counts as a clean run.
        Ok(KernelRun::Verified | KernelRun::BuildFailed) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
