//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the per-user store to verify `snip_core` wiring end to end.
//! - Keep output deterministic for quick local sanity checks.

use snip_core::{core_version, default_log_level, init_logging, Store, StorePaths};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("snip: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), snip_core::StoreError> {
    let paths = StorePaths::from_env()?;
    // Logging is best effort here; a bad log dir must not hide the store check.
    if let Err(err) = init_logging(default_log_level(), &paths.logs) {
        eprintln!("snip: logging disabled: {err}");
    }

    let store = Store::open(paths)?;
    println!("snip_core version={}", core_version());
    println!("schema version={}", store.schema_version()?);
    println!("notes={}", store.note_count()?);
    Ok(())
}
