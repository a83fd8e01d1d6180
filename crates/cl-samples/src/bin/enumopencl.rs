use std::process::ExitCode;

use cl_samples::{cli::init_logging, ClError, Inventory};

fn run() -> Result<(), ClError> {
    let inventory = Inventory::query()?;
    tracing::debug!(
        platforms = inventory.platforms.len(),
        devices = inventory.device_count(),
        "inventory complete"
    );
    print!("{}", inventory.to_yaml()?);
    Ok(())
}

fn main() -> ExitCode {
    init_logging(0);

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "enumeration failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
