//! nvda_portable - CI pipeline that builds a portable NVDA with the AT Automation add-on.
//!
//! Each task is a subcommand; exit code 0 means the task succeeded and every artifact it
//! promised exists.

use nvda_portable_builder::cli;
use std::process;

#[tokio::main]
async fn main() {
    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
