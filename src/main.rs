//! dmg_repack - repackage a macOS Electron installer for Linux.
//!
//! Runs one pipeline command. Ctrl-C drops the running command, which releases
//! the terminal if the interactive chooser holds it, and exits with status 1.

use dmg_repack::cli;
use dmg_repack::cli::OutputManager;
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    // The command future is dropped when the select ends, before exiting
    let outcome = tokio::select! {
        result = cli::run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(result) = outcome else {
        OutputManager::new(false, false).error("Interrupted");
        process::exit(1);
    };

    match result {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) if e.is_cancellation() => {
            let output = OutputManager::new(false, false);
            output.error("Selection cancelled");
            process::exit(1);
        }
        Err(e) => {
            // Create output manager for error display (never quiet for fatal errors)
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
